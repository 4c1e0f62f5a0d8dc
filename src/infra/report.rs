use std::error::Error;

/// Render `err` followed by each of its causes, joined with ": ".
///
/// A cause whose text already appears earlier in the chain is skipped, so
/// wrappers that embed their source with `{0}` do not repeat it.
pub fn error_chain(err: &dyn Error) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !text.is_empty() && !rendered.contains(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = cause.source();
    }
    rendered
}
