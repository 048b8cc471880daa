//! IMAP probe retrieval

use crate::compose::MessageId;
use crate::config::ImapConfig;
use crate::error::{Error, Result};
use async_imap::Session;
use futures::StreamExt;
use mailparse::MailHeaderMap;
use rustls::pki_types::ServerName;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use tracing::{debug, info};

type ImapSession = Session<Compat<tokio_rustls::client::TlsStream<TcpStream>>>;

/// A probe fetched back out of the destination mailbox.
#[derive(Debug, Clone)]
pub struct DeliveredMessage {
    /// The id the mailbox was searched for, byte-identical to the one
    /// the composer embedded.
    pub message_id: MessageId,
    /// Raw RFC 5322 bytes as delivered, trace headers included.
    pub raw: Vec<u8>,
}

/// Read-only IMAP client for the destination mailbox.
///
/// Opens one session per operation: a fresh SELECT is what makes mail
/// delivered between polls visible.
pub struct ImapReceiver {
    config: ImapConfig,
}

impl ImapReceiver {
    #[must_use]
    pub const fn new(config: ImapConfig) -> Self {
        Self { config }
    }

    /// Log in and select the mailbox once, then log out again.
    ///
    /// Run before sending a probe so that bad credentials or a missing
    /// mailbox surface while nothing is in flight yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, login, or SELECT fails.
    pub async fn connect(&self) -> Result<()> {
        let mut session = self.connect_session().await?;
        let checked = self.select(&mut session, &self.config.mailbox).await;
        session.logout().await.ok();
        checked
    }

    /// Look for the probe with this Message-ID. One attempt, no
    /// waiting: delivery is asynchronous and polling is the caller's
    /// job, so an empty mailbox is `Ok(None)`, not an error.
    ///
    /// The server-side search matches the Message-ID header by
    /// substring; only a message whose parsed header equals the
    /// requested id exactly is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection, SELECT, SEARCH, or FETCH
    /// fails.
    pub async fn get_test_message(&self, id: &MessageId) -> Result<Option<DeliveredMessage>> {
        let mut session = self.connect_session().await?;
        self.select(&mut session, &self.config.mailbox).await?;

        let found = self.search_exact(&mut session, id).await;
        session.logout().await.ok();
        found
    }

    // -- private helpers --

    async fn search_exact(
        &self,
        session: &mut ImapSession,
        id: &MessageId,
    ) -> Result<Option<DeliveredMessage>> {
        let query = format!("HEADER Message-ID \"{}\"", id.bracketed());
        let uids = session
            .uid_search(&query)
            .await
            .map_err(|e| Error::Imap(format!("Search failed: {e}")))?;

        let mut uid_list: Vec<u32> = uids.into_iter().collect();
        uid_list.sort_unstable();

        debug!("Search for {} returned {} candidate(s)", id, uid_list.len());

        for uid in uid_list {
            let Some(raw) = self.fetch_raw(session, uid).await? else {
                continue;
            };
            if message_id_matches(&raw, id) {
                info!("Probe {} delivered (UID {})", id, uid);
                return Ok(Some(DeliveredMessage {
                    message_id: id.clone(),
                    raw,
                }));
            }
            debug!("UID {} is not an exact Message-ID match, skipping", uid);
        }

        Ok(None)
    }

    async fn fetch_raw(&self, session: &mut ImapSession, uid: u32) -> Result<Option<Vec<u8>>> {
        let uid_set = format!("{uid}");
        let mut messages = session
            .uid_fetch(&uid_set, "(BODY.PEEK[])")
            .await
            .map_err(|e| Error::Imap(format!("Fetch failed: {e}")))?;

        if let Some(msg_result) = messages.next().await {
            let msg = msg_result.map_err(|e| Error::Imap(format!("Fetch error: {e}")))?;
            if let Some(body) = msg.body() {
                return Ok(Some(body.to_vec()));
            }
        }

        Ok(None)
    }

    #[allow(clippy::unused_self, clippy::unnecessary_wraps)]
    fn tls_connector(&self) -> Result<TlsConnector> {
        let config = rustls::ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(DangerousVerifier))
            .with_no_client_auth();
        Ok(TlsConnector::from(Arc::new(config)))
    }

    async fn connect_session(&self) -> Result<ImapSession> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        debug!("Connecting to IMAP server at {}", addr);

        let tcp_stream = TcpStream::connect(&addr).await?;
        let mut client = async_imap::Client::new(tcp_stream.compat());

        client
            .run_command_and_check_ok("STARTTLS", None)
            .await
            .map_err(|e| Error::Tls(format!("STARTTLS failed: {e}")))?;

        let connector = self.tls_connector()?;
        let server_name = ServerName::try_from(self.config.host.clone())
            .map_err(|e| Error::Tls(format!("Invalid server name: {e}")))?;

        let inner = client.into_inner().into_inner();
        let tls_stream = connector
            .connect(server_name, inner)
            .await
            .map_err(|e| Error::Tls(e.to_string()))?;

        let tls_client = async_imap::Client::new(tls_stream.compat());

        let session = tls_client
            .login(&self.config.username, &self.config.password)
            .await
            .map_err(|(e, _)| Error::Imap(format!("Login failed: {e}")))?;

        debug!("IMAP session established");
        Ok(session)
    }

    async fn select(&self, session: &mut ImapSession, mailbox: &str) -> Result<()> {
        session
            .select(mailbox)
            .await
            .map_err(|e| Error::Imap(format!("Failed to select {mailbox}: {e}")))?;
        Ok(())
    }
}

fn message_id_matches(raw: &[u8], id: &MessageId) -> bool {
    mailparse::parse_headers(raw)
        .ok()
        .and_then(|(headers, _)| headers.get_first_value("Message-ID"))
        .is_some_and(|value| value.trim() == id.bracketed())
}

/// Certificate verifier that accepts all certificates. Internal mail
/// hosts routinely serve self-signed certificates, and the retrieval
/// hop is tooling, not the path under test.
#[derive(Debug)]
struct DangerousVerifier;

impl rustls::client::danger::ServerCertVerifier for DangerousVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ED25519,
        ]
    }
}
