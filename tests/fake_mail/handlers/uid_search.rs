//! UID SEARCH command handler.
//!
//! The probe receiver locates its mail with `UID SEARCH HEADER
//! Message-ID "<id>"`, so `HEADER` is the criterion that matters
//! here. RFC 3501 defines it as a case-insensitive *substring* match
//! over the header value: a search for one Message-ID may come back
//! with extra UIDs whose header merely contains the searched id.
//!
//! The response format (RFC 3501 Section 7.2.5):
//!
//! ```text
//! * SEARCH 1 2
//! A0003 OK SEARCH completed
//! ```

use crate::fake_mail::io::send;
use crate::fake_mail::store::{MailStore, StoredMail};
use imap_codec::imap_types::search::SearchKey;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Handle the UID SEARCH command. Returns matching UIDs from the
/// store.
pub async fn handle_uid_search<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    criteria: &[SearchKey<'_>],
    store: &MailStore,
    selected: Option<&str>,
    stream: &mut BufReader<S>,
) {
    if selected.is_none() {
        let _ = send(stream, format!("{tag} BAD No mailbox selected\r\n")).await;
        return;
    }

    let hits: Vec<String> = store
        .mails
        .iter()
        .filter(|m| criteria.iter().all(|key| matches_key(m, key)))
        .map(|m| m.uid.to_string())
        .collect();

    // An empty result still gets its untagged SEARCH line.
    let _ = send(stream, format!("* SEARCH {}\r\n", hits.join(" "))).await;
    let _ = send(stream, format!("{tag} OK SEARCH completed\r\n")).await;
}

/// Check one stored message against a single `SearchKey`.
fn matches_key(mail: &StoredMail, key: &SearchKey<'_>) -> bool {
    match key {
        SearchKey::All => true,
        SearchKey::Header(field, value) => {
            let field = String::from_utf8_lossy(field.as_ref());
            let needle = String::from_utf8_lossy(value.as_ref()).to_ascii_lowercase();
            header_value(&mail.raw, &field)
                .is_some_and(|v| v.to_ascii_lowercase().contains(&needle))
        }
        // Criteria the probe tooling never sends; match everything.
        _ => true,
    }
}

/// Pull a header value out of raw message bytes by field name
/// (case-insensitive). Continuation lines of folded headers are
/// ignored, which is fine for the single-line ids searched here.
fn header_value(raw: &[u8], name: &str) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let headers = text.split("\r\n\r\n").next().unwrap_or("");

    for line in headers.lines() {
        if let Some((field, value)) = line.split_once(':') {
            if field.eq_ignore_ascii_case(name) {
                return Some(value.trim().to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use imap_codec::imap_types::core::AString;
    use tokio::io::{AsyncBufReadExt, BufReader};

    fn make_email(message_id: &str) -> Vec<u8> {
        format!(
            "From: a@b.com\r\n\
             Subject: Test\r\n\
             Message-ID: {message_id}\r\n\
             \r\n\
             Body"
        )
        .into_bytes()
    }

    fn header_key(field: &str, value: &str) -> SearchKey<'static> {
        SearchKey::Header(
            AString::try_from(field.to_string()).unwrap(),
            AString::try_from(value.to_string()).unwrap(),
        )
    }

    /// Run the handler and return the untagged SEARCH line and the
    /// tagged completion line, terminators stripped.
    async fn search_lines(
        tag: &str,
        criteria: &[SearchKey<'_>],
        store: &MailStore,
        selected: Option<&str>,
    ) -> Vec<String> {
        let (client, server) = tokio::io::duplex(4096);
        let mut stream = BufReader::new(server);
        handle_uid_search(tag, criteria, store, selected, &mut stream).await;
        drop(stream);

        let mut lines = Vec::new();
        let mut reply = BufReader::new(client).lines();
        while let Some(line) = reply.next_line().await.unwrap() {
            lines.push(line);
        }
        lines
    }

    #[tokio::test]
    async fn search_all_returns_every_uid() {
        let mut store = MailStore::new();
        store.deliver(make_email("<one@x.test>"));
        store.deliver(make_email("<two@x.test>"));

        let lines = search_lines("A1", &[SearchKey::All], &store, Some("INBOX")).await;

        assert_eq!(lines, vec!["* SEARCH 1 2", "A1 OK SEARCH completed"]);
    }

    #[tokio::test]
    async fn header_search_finds_the_matching_message() {
        let mut store = MailStore::new();
        store.deliver(make_email("<one@x.test>"));
        store.deliver(make_email("<two@x.test>"));

        let lines = search_lines(
            "A1",
            &[header_key("Message-ID", "<two@x.test>")],
            &store,
            Some("INBOX"),
        )
        .await;

        assert_eq!(lines[0], "* SEARCH 2");
    }

    #[tokio::test]
    async fn header_search_matches_by_substring() {
        let mut store = MailStore::new();
        store.deliver(make_email("<probe@x.test>"));
        store.deliver(make_email("<probe@x.test> (duplicate)"));

        let lines = search_lines(
            "A1",
            &[header_key("Message-ID", "<probe@x.test>")],
            &store,
            Some("INBOX"),
        )
        .await;

        // Both contain the searched id; RFC 3501 says both match.
        assert_eq!(lines[0], "* SEARCH 1 2");
    }

    #[tokio::test]
    async fn header_field_name_is_case_insensitive() {
        let mut store = MailStore::new();
        store.deliver(make_email("<one@x.test>"));

        let lines = search_lines(
            "A1",
            &[header_key("message-id", "<one@x.test>")],
            &store,
            Some("INBOX"),
        )
        .await;

        assert_eq!(lines[0], "* SEARCH 1");
    }

    #[tokio::test]
    async fn no_match_returns_empty_search() {
        let mut store = MailStore::new();
        store.deliver(make_email("<one@x.test>"));

        let lines = search_lines(
            "A1",
            &[header_key("Message-ID", "<absent@x.test>")],
            &store,
            Some("INBOX"),
        )
        .await;

        assert_eq!(lines, vec!["* SEARCH ", "A1 OK SEARCH completed"]);
    }

    #[tokio::test]
    async fn no_mailbox_selected_returns_bad() {
        let store = MailStore::new();

        let lines = search_lines("A1", &[SearchKey::All], &store, None).await;

        assert_eq!(lines, vec!["A1 BAD No mailbox selected"]);
    }

    #[test]
    fn header_value_skips_other_fields() {
        let raw = make_email("<one@x.test>");
        assert_eq!(
            header_value(&raw, "Message-ID"),
            Some("<one@x.test>".to_string())
        );
        assert_eq!(header_value(&raw, "Subject"), Some("Test".to_string()));
        assert!(header_value(&raw, "Received").is_none());
    }
}
