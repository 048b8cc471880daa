//! NOOP command handler.
//!
//! RFC 3501 Section 6.1.2 requires this command. Clients use it for
//! keepalive.

use crate::fake_mail::io::send;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Handle the NOOP command.
pub async fn handle_noop<S: AsyncRead + AsyncWrite + Unpin>(tag: &str, stream: &mut BufReader<S>) {
    let _ = send(stream, format!("{tag} OK NOOP completed\r\n")).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, BufReader};

    #[tokio::test]
    async fn confirms_with_the_caller_tag() {
        let (client, server) = tokio::io::duplex(1024);
        handle_noop("A7", &mut BufReader::new(server)).await;

        let mut line = String::new();
        BufReader::new(client).read_line(&mut line).await.unwrap();
        assert_eq!(line, "A7 OK NOOP completed\r\n");
    }
}
