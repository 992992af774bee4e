// src/inject.rs
use crate::client::SCRIPT_TAG;

const BODY_CLOSE: &str = "</body>";

/// Adds the reload poller include to an HTML document.
///
/// The tag goes immediately before the last `</body>` (case-sensitive), or at
/// the very end when there is none. Every other byte is left untouched.
pub fn inject_reload_script(html: &str) -> String {
    let mut result = String::with_capacity(html.len() + SCRIPT_TAG.len());
    match html.rfind(BODY_CLOSE) {
        Some(pos) => {
            result.push_str(&html[..pos]);
            result.push_str(SCRIPT_TAG);
            result.push_str(&html[pos..]);
        }
        None => {
            result.push_str(html);
            result.push_str(SCRIPT_TAG);
        }
    }
    result
}
