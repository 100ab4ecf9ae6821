//! Parser for `gpg --with-colons --list-secret-keys` output.
//!
//! Only the records needed to pick a key are read: `sec` opens a key
//! (field 5 is the long key id, field 6 the creation timestamp), `fpr`
//! carries the fingerprint in field 10, and `uid` carries the user id in
//! field 10. Other record types are skipped.

/// One secret key from a colon listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SecretKeyEntry {
    pub key_id: String,
    pub fingerprint: Option<String>,
    pub created: u64,
    pub uids: Vec<String>,
}

impl SecretKeyEntry {
    /// Fingerprint when known, otherwise the long key id.
    pub fn identifier(&self) -> &str {
        self.fingerprint.as_deref().unwrap_or(&self.key_id)
    }

    fn has_email(&self, email: &str) -> bool {
        let wanted = format!("<{}>", email.to_ascii_lowercase());
        self.uids.iter().any(|uid| {
            let uid = uid.to_ascii_lowercase();
            uid.contains(&wanted) || uid == email.to_ascii_lowercase()
        })
    }
}

/// Why no single key could be chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    NotFound,
    Ambiguous(Vec<String>),
}

/// Parse every `sec` entry in a listing.
pub fn parse(listing: &str) -> Vec<SecretKeyEntry> {
    let mut entries: Vec<SecretKeyEntry> = Vec::new();
    // fpr records after an ssb belong to the subkey.
    let mut in_primary = false;
    for line in listing.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        match fields.first().copied() {
            Some("sec") => {
                in_primary = true;
                entries.push(SecretKeyEntry {
                    key_id: field(&fields, 4).to_string(),
                    fingerprint: None,
                    created: field(&fields, 5).parse().unwrap_or(0),
                    uids: Vec::new(),
                });
            }
            Some("ssb") => in_primary = false,
            Some("fpr") if in_primary => {
                if let Some(entry) = entries.last_mut() {
                    let fpr = field(&fields, 9);
                    if entry.fingerprint.is_none() && !fpr.is_empty() {
                        entry.fingerprint = Some(fpr.to_string());
                    }
                }
            }
            Some("uid") => {
                if let Some(entry) = entries.last_mut() {
                    entry.uids.push(unescape(field(&fields, 9)));
                }
            }
            _ => {}
        }
    }
    entries
}

/// Pick the most recently created key carrying `email`.
pub fn select<'a>(entries: &'a [SecretKeyEntry], email: &str) -> Result<&'a SecretKeyEntry, Selection> {
    let matching: Vec<&SecretKeyEntry> = entries.iter().filter(|e| e.has_email(email)).collect();
    let latest = matching
        .iter()
        .map(|e| e.created)
        .max()
        .ok_or(Selection::NotFound)?;
    let newest: Vec<&SecretKeyEntry> = matching.into_iter().filter(|e| e.created == latest).collect();
    match newest.as_slice() {
        [only] => Ok(*only),
        many => Err(Selection::Ambiguous(
            many.iter().map(|e| e.identifier().to_string()).collect(),
        )),
    }
}

fn field<'a>(fields: &[&'a str], index: usize) -> &'a str {
    fields.get(index).copied().unwrap_or("")
}

/// Undo the `\xHH` escaping gpg applies to colons and control bytes in uids.
fn unescape(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && bytes[i + 1] == b'x' {
            if let Some(byte) = std::str::from_utf8(&bytes[i + 2..i + 4])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
            {
                out.push(byte);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LISTING: &str = "\
sec:u:4096:1:AAAA1111BBBB2222:1700000000:::u:::scESC:::+:::23::0:
fpr:::::::::0123456789ABCDEF0123456789ABCDEFAAAA1111:
grp:::::::::ABCDEF:
uid:u::::1700000000::HASH::Rune Bot <rune-bot@example.com>::::::::::0:
ssb:u:4096:1:CCCC3333DDDD4444:1700000000::::::e:::+:::23:
fpr:::::::::FFFF0000FFFF0000FFFF0000FFFF0000CCCC3333:
sec:u:4096:1:EEEE5555FFFF6666:1700000500:::u:::scESC:::+:::23::0:
fpr:::::::::99999999999999999999999999999999EEEE5555:
uid:u::::1700000500::HASH::Rune Bot <rune-bot@example.com>::::::::::0:
sec:u:2048:1:1234123412341234:1700000900:::u:::scESC:::+:::23::0:
uid:u::::1700000900::HASH::Someone Else <other@example.com>::::::::::0:
";

    #[test]
    fn parses_entries_and_primary_fingerprint() {
        let entries = parse(LISTING);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].key_id, "AAAA1111BBBB2222");
        assert_eq!(entries[0].created, 1_700_000_000);
        assert_eq!(
            entries[0].fingerprint.as_deref(),
            Some("0123456789ABCDEF0123456789ABCDEFAAAA1111")
        );
        assert_eq!(entries[0].uids, vec!["Rune Bot <rune-bot@example.com>"]);
        assert_eq!(entries[2].fingerprint, None);
    }

    #[test]
    fn selects_latest_matching_email() {
        let entries = parse(LISTING);
        let chosen = select(&entries, "rune-bot@example.com").unwrap();
        assert_eq!(chosen.identifier(), "99999999999999999999999999999999EEEE5555");
    }

    #[test]
    fn falls_back_to_key_id_without_fingerprint() {
        let entries = parse(LISTING);
        let chosen = select(&entries, "OTHER@example.com").unwrap();
        assert_eq!(chosen.identifier(), "1234123412341234");
    }

    #[test]
    fn no_match_is_not_found() {
        let entries = parse(LISTING);
        assert_eq!(select(&entries, "nobody@example.com"), Err(Selection::NotFound));
        assert_eq!(select(&[], "rune-bot@example.com"), Err(Selection::NotFound));
    }

    #[test]
    fn tie_on_creation_time_is_ambiguous() {
        let listing = "\
sec:u:4096:1:AAAA:1700000000::::::::::::
uid:u::::::::A <dup@example.com>:
sec:u:4096:1:BBBB:1700000000::::::::::::
uid:u::::::::B <dup@example.com>:
";
        let entries = parse(listing);
        assert_eq!(
            select(&entries, "dup@example.com"),
            Err(Selection::Ambiguous(vec!["AAAA".into(), "BBBB".into()]))
        );
    }

    #[test]
    fn escaped_uid_is_decoded() {
        let listing = "sec:u:1:1:K:1::::\nuid:u::::::::Bot\\x3a CI <ci@example.com>:\n";
        let entries = parse(listing);
        assert_eq!(entries[0].uids, vec!["Bot: CI <ci@example.com>"]);
    }
}
