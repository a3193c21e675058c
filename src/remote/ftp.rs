use super::{RemoteConnector, RemoteError, RemoteStore};
use async_trait::async_trait;
use std::io::Cursor;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream};
use tracing::{debug, info};

/// Connection parameters for a plain FTP server
#[derive(Debug, Clone)]
pub struct FtpConnector {
    host: String,
    port: u16,
    user: String,
    password: String,
}

impl FtpConnector {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
        }
    }
}

#[async_trait]
impl RemoteConnector for FtpConnector {
    type Store = FtpStore;

    async fn connect(&self) -> Result<FtpStore, RemoteError> {
        let host = self.host.clone();
        let port = self.port;
        let user = self.user.clone();
        let password = self.password.clone();

        let stream = tokio::task::spawn_blocking(move || -> Result<FtpStream, RemoteError> {
            let mut stream = FtpStream::connect((host.as_str(), port)).map_err(|e| {
                RemoteError::Connection {
                    host: format!("{}:{}", host, port),
                    message: e.to_string(),
                }
            })?;
            stream
                .login(user.as_str(), password.as_str())
                .map_err(|e| RemoteError::Login {
                    user: user.clone(),
                    message: e.to_string(),
                })?;
            stream
                .transfer_type(FileType::Binary)
                .map_err(|e| RemoteError::Command(e.to_string()))?;
            Ok(stream)
        })
        .await
        .map_err(|e| RemoteError::Join(e.to_string()))??;

        info!(host = %self.host, user = %self.user, "Connected");
        Ok(FtpStore {
            stream: Some(stream),
        })
    }

    fn describe(&self) -> String {
        format!("ftp://{}@{}:{}", self.user, self.host, self.port)
    }
}

/// A logged-in FTP session
pub struct FtpStore {
    // Taken while a blocking call runs on the blocking pool
    stream: Option<FtpStream>,
}

impl FtpStore {
    async fn with_stream<T, F>(&mut self, op: F) -> Result<T, RemoteError>
    where
        F: FnOnce(&mut FtpStream) -> Result<T, RemoteError> + Send + 'static,
        T: Send + 'static,
    {
        let mut stream = self.stream.take().ok_or(RemoteError::Closed)?;
        let (stream, result) = tokio::task::spawn_blocking(move || {
            let result = op(&mut stream);
            (stream, result)
        })
        .await
        .map_err(|e| RemoteError::Join(e.to_string()))?;
        self.stream = Some(stream);
        result
    }
}

/// Servers answer MKD on an existing directory with a 550 whose text
/// varies ("File exists", "Directory already exists", ...). The same code
/// is used for a missing parent ("Directory does not exist"), which must
/// not be taken for success.
fn is_already_exists_reply(message: &str) -> bool {
    let message = message.to_lowercase();
    if message.contains("not exist") || message.contains("no such") {
        return false;
    }
    message.contains("file exists") || message.contains("already exists")
}

fn classify_mkdir_error(path: &str, err: FtpError) -> RemoteError {
    let message = err.to_string();
    if is_already_exists_reply(&message) {
        RemoteError::AlreadyExists(path.to_string())
    } else {
        RemoteError::Command(format!("MKD {}: {}", path, message))
    }
}

#[async_trait]
impl RemoteStore for FtpStore {
    async fn make_dir(&mut self, path: &str) -> Result<(), RemoteError> {
        let path = path.to_string();
        self.with_stream(move |stream| {
            stream
                .mkdir(path.as_str())
                .map_err(|e| classify_mkdir_error(&path, e))
        })
        .await
    }

    async fn put_file(&mut self, path: &str, content: Vec<u8>) -> Result<u64, RemoteError> {
        let path = path.to_string();
        debug!(path = %path, bytes = content.len(), "STOR");
        self.with_stream(move |stream| {
            let mut reader = Cursor::new(content);
            stream
                .put_file(path.as_str(), &mut reader)
                .map_err(|e| RemoteError::Transfer {
                    path: path.clone(),
                    message: e.to_string(),
                })
        })
        .await
    }

    async fn set_permissions(&mut self, path: &str, mode: &str) -> Result<(), RemoteError> {
        let command = format!("CHMOD {} {}", mode, path);
        self.with_stream(move |stream| {
            stream
                .site(command.as_str())
                .map(|_| ())
                .map_err(|e| RemoteError::Command(format!("SITE {}: {}", command, e)))
        })
        .await
    }

    async fn quit(&mut self) -> Result<(), RemoteError> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };
        tokio::task::spawn_blocking(move || stream.quit())
            .await
            .map_err(|e| RemoteError::Join(e.to_string()))?
            .map_err(|e| RemoteError::Command(format!("QUIT: {}", e)))
    }
}
