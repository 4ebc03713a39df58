//! Blocking FTP client: one control connection, passive data connections
//!
//! Only what an upload needs: greeting, USER/PASS, TYPE I, PASV, STOR, QUIT.

use std::io::{self, BufReader, Read, Write};
use std::net::{SocketAddr, SocketAddrV4, TcpStream, ToSocketAddrs};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::protocol::{self, codes, Reply};

/// Result type for raw client operations
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Failure of a single FTP exchange
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("unexpected reply to {command}: {reply}")]
    UnexpectedReply { command: String, reply: Reply },

    #[error("cannot parse passive mode reply: {0}")]
    InvalidPassiveReply(Reply),
}

impl ClientError {
    fn unexpected(command: &str, reply: Reply) -> Self {
        Self::UnexpectedReply {
            command: command.to_string(),
            reply,
        }
    }
}

/// Connected FTP session
#[derive(Debug)]
pub struct FtpClient {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    peer: SocketAddr,
    timeout: Duration,
}

impl FtpClient {
    /// Connects to `host:port` and waits for the 220 greeting.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> ClientResult<Self> {
        let mut last_error = None;
        for addr in (host, port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => return Self::from_stream(stream, timeout),
                Err(e) => {
                    debug!("Connection to {} failed: {}", addr, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no address found for {}", host),
                )
            })
            .into())
    }

    fn from_stream(stream: TcpStream, timeout: Duration) -> ClientResult<Self> {
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        let peer = stream.peer_addr()?;
        let writer = stream.try_clone()?;

        let mut client = Self {
            reader: BufReader::new(stream),
            writer,
            peer,
            timeout,
        };

        let greeting = client.read_reply()?;
        if greeting.code != codes::SERVICE_READY {
            return Err(ClientError::unexpected("greeting", greeting));
        }
        debug!("Connected to {}: {}", peer, greeting.message());
        Ok(client)
    }

    /// Sends USER and, when asked for it, PASS.
    pub fn login(&mut self, username: &str, password: &str) -> ClientResult<()> {
        let reply = self.command("USER", Some(username))?;
        let reply = match reply.code {
            codes::LOGGED_IN => return Ok(()),
            codes::NEED_PASSWORD => self.command("PASS", Some(password))?,
            _ => return Err(ClientError::unexpected("USER", reply)),
        };

        if reply.is_completion() {
            Ok(())
        } else {
            Err(ClientError::unexpected("PASS", reply))
        }
    }

    /// Switches to binary (image) transfer type.
    pub fn set_binary(&mut self) -> ClientResult<()> {
        let reply = self.command("TYPE", Some("I"))?;
        if reply.code == codes::COMMAND_OK {
            Ok(())
        } else {
            Err(ClientError::unexpected("TYPE", reply))
        }
    }

    /// Asks the server for a passive data address.
    ///
    /// An unspecified address in the reply is replaced by the control
    /// connection's peer.
    pub fn passive(&mut self) -> ClientResult<SocketAddr> {
        let reply = self.command("PASV", None)?;
        if reply.code != codes::ENTERING_PASSIVE {
            return Err(ClientError::unexpected("PASV", reply));
        }

        let addr = match protocol::parse_pasv(&reply.message()) {
            Some(addr) => addr,
            None => return Err(ClientError::InvalidPassiveReply(reply)),
        };

        Ok(data_address(addr, self.peer))
    }

    /// Stores everything `source` yields at `remote_path`, returns bytes sent.
    pub fn store<R: Read + ?Sized>(&mut self, remote_path: &str, source: &mut R) -> ClientResult<u64> {
        let data_addr = self.passive()?;
        let mut data = TcpStream::connect_timeout(&data_addr, self.timeout)?;
        data.set_write_timeout(Some(self.timeout))?;

        let reply = self.command("STOR", Some(remote_path))?;
        if !matches!(
            reply.code,
            codes::OPENING_DATA_CONNECTION | codes::DATA_CONNECTION_OPEN
        ) {
            return Err(ClientError::unexpected("STOR", reply));
        }

        let bytes = io::copy(source, &mut data)?;
        data.flush()?;
        // Closing the data connection marks end of file
        drop(data);

        let reply = self.read_reply()?;
        if matches!(
            reply.code,
            codes::TRANSFER_COMPLETE | codes::FILE_ACTION_OK
        ) {
            debug!("Stored {} bytes at {}", bytes, remote_path);
            Ok(bytes)
        } else {
            Err(ClientError::unexpected("STOR", reply))
        }
    }

    /// Ends the session politely.
    pub fn quit(mut self) -> ClientResult<()> {
        let reply = self.command("QUIT", None)?;
        if reply.code == codes::CLOSING || reply.is_completion() {
            Ok(())
        } else {
            Err(ClientError::unexpected("QUIT", reply))
        }
    }

    fn command(&mut self, command: &str, arg: Option<&str>) -> ClientResult<Reply> {
        if command == "PASS" {
            debug!("> PASS ***");
        } else {
            debug!("> {} {}", command, arg.unwrap_or(""));
        }
        protocol::write_command(&mut self.writer, command, arg)?;
        self.read_reply()
    }

    fn read_reply(&mut self) -> ClientResult<Reply> {
        let reply = protocol::read_reply(&mut self.reader)?;
        debug!("< {}", reply);
        Ok(reply)
    }
}

/// Address to open for a passive transfer.
///
/// Servers behind NAT often answer PASV with 0.0.0.0; the data connection
/// then goes to the control connection's peer, whatever its address family.
fn data_address(reply: SocketAddrV4, peer: SocketAddr) -> SocketAddr {
    if reply.ip().is_unspecified() {
        SocketAddr::new(peer.ip(), reply.port())
    } else {
        SocketAddr::V4(reply)
    }
}
