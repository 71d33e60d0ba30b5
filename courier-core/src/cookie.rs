//! Reading values out of a `Cookie`-style string.

use percent_encoding::percent_decode_str;

/// Look up `name` in a `name=value; other=value` cookie string.
///
/// The value is percent-decoded. Returns `None` when the cookie is absent.
pub fn read_cookie(cookies: &str, name: &str) -> Option<String> {
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim_start().split_once('=')?;
        (key == name).then(|| percent_decode_str(value).decode_utf8_lossy().into_owned())
    })
}
