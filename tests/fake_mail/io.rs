//! Stream write helper shared by the fake mail servers.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Write one complete reply and flush it out.
///
/// Takes anything byte-shaped, so SMTP status lines, IMAP responses,
/// and FETCH literals all go through the same path. The client under
/// test blocks on each reply, so nothing may sit in a write buffer.
pub async fn send<S, B>(stream: &mut BufReader<S>, reply: B) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
    B: AsRef<[u8]>,
{
    let raw = stream.get_mut();
    raw.write_all(reply.as_ref()).await?;
    raw.flush().await
}
