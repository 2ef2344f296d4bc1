//! Export filename derivation and RFC 5987 `Content-Disposition` encoding
//! (§4.10). Control characters and CRLF are stripped before either form is
//! built so neither can be used to inject header fields.

use percent_encoding::{AsciiSet, CONTROLS};

const ATTR_CHAR_EXCEPTIONS: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'%')
    .add(b'\'')
    .add(b'(')
    .add(b')')
    .add(b'*')
    .add(b',')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'{')
    .add(b'}');

pub struct ExportFilename {
    pub ascii: String,
    pub utf8: String,
}

/// Strip control characters and CRLF, fall back to `anketa` if nothing
/// usable remains.
fn sanitize_company_name(name: &str) -> String {
    let cleaned: String = name.chars().filter(|c| !c.is_control()).collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        "anketa".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn export_filename(company_name: &str, extension: &str) -> ExportFilename {
    let safe = sanitize_company_name(company_name);
    let utf8 = format!("{safe}.{extension}");
    let ascii_stem: String = safe.chars().map(|c| if c.is_ascii() && c != '"' && c != '\\' { c } else { '_' }).collect();
    ExportFilename { ascii: format!("{ascii_stem}.{extension}"), utf8 }
}

/// Dual-encoded `Content-Disposition` header value: an ASCII-safe
/// `filename=` plus a UTF-8 `filename*=` per RFC 5987.
pub fn content_disposition(filename: &ExportFilename) -> String {
    let encoded = percent_encoding::utf8_percent_encode(&filename.utf8, ATTR_CHAR_EXCEPTIONS);
    format!("attachment; filename=\"{}\"; filename*=UTF-8''{}", filename.ascii, encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_control_characters_and_crlf() {
        let name = export_filename("Acme\r\nCorp\u{0007}", "md");
        assert!(!name.utf8.contains('\r'));
        assert!(!name.utf8.contains('\n'));
    }

    #[test]
    fn empty_company_name_falls_back_to_anketa() {
        let name = export_filename("", "md");
        assert_eq!(name.utf8, "anketa.md");
    }

    #[test]
    fn non_ascii_is_preserved_in_utf8_variant_and_masked_in_ascii_variant() {
        let name = export_filename("Компания", "md");
        assert_eq!(name.utf8, "Компания.md");
        assert!(name.ascii.chars().all(|c| c.is_ascii()));
    }

    #[test]
    fn content_disposition_carries_both_parameters() {
        let name = export_filename("Компания", "html");
        let header = content_disposition(&name);
        assert!(header.starts_with("attachment; filename=\""));
        assert!(header.contains("filename*=UTF-8''"));
    }
}
