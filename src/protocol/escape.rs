//! Field-level escaping for free text values.
//!
//! Free text such as the terms-of-service body cannot carry raw newlines on
//! the wire. It is sent form-encoded, except that spaces stay literal spaces.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything outside `A-Z a-z 0-9 - _ . ! * ( )` and space is escaped.
const FORM_TEXT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'*')
    .remove(b'(')
    .remove(b')')
    .remove(b' ');

/// Escape free text for transport inside a single field value.
pub fn escape_text(text: &str) -> String {
    utf8_percent_encode(text, FORM_TEXT).to_string()
}
