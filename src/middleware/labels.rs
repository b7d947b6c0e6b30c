//! Metric label values with bounded cardinality.
//!
//! Well-known inputs map to `'static` labels; anything else falls back to a
//! normalized owned string so the observation is never dropped.

use std::borrow::Cow;

/// Lowercase label for an HTTP method.
///
/// The common methods are matched case-insensitively, so `GET`, `get` and
/// `Get` share one label. Other methods are lowercased as-is.
pub fn sanitize_method(method: &str) -> Cow<'static, str> {
    const KNOWN: [&str; 8] =
        ["get", "put", "head", "post", "delete", "connect", "options", "notify"];

    match KNOWN.iter().find(|known| known.eq_ignore_ascii_case(method)) {
        Some(&known) => Cow::Borrowed(known),
        None => Cow::Owned(method.to_lowercase()),
    }
}

/// Label for a response status code.
///
/// `0` means the handler never committed a status, which the server answers
/// as `200 OK`, so it shares the `"200"` label.
pub fn sanitize_code(code: u16) -> Cow<'static, str> {
    let label = match code {
        100 => "100",
        101 => "101",

        200 | 0 => "200",
        201 => "201",
        202 => "202",
        203 => "203",
        204 => "204",
        205 => "205",
        206 => "206",

        300 => "300",
        301 => "301",
        302 => "302",
        304 => "304",
        305 => "305",
        307 => "307",

        400 => "400",
        401 => "401",
        402 => "402",
        403 => "403",
        404 => "404",
        405 => "405",
        406 => "406",
        407 => "407",
        408 => "408",
        409 => "409",
        410 => "410",
        411 => "411",
        412 => "412",
        413 => "413",
        414 => "414",
        415 => "415",
        416 => "416",
        417 => "417",
        418 => "418",
        428 => "428",
        429 => "429",
        431 => "431",

        500 => "500",
        501 => "501",
        502 => "502",
        503 => "503",
        504 => "504",
        505 => "505",
        511 => "511",

        _ => return Cow::Owned(code.to_string()),
    };
    Cow::Borrowed(label)
}
