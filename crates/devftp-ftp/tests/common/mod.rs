//! In-process fake FTP server for upload tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

pub const USERNAME: &str = "deploy";
pub const PASSWORD: &str = "s3cret";

/// How the fake server behaves
#[derive(Debug, Clone)]
pub struct ServerBehavior {
    pub greeting: String,
    pub stor_reply: Option<String>,
}

impl Default for ServerBehavior {
    fn default() -> Self {
        Self {
            greeting: "220 fake ftp ready".to_string(),
            stor_reply: None,
        }
    }
}

/// Single-session FTP server bound to 127.0.0.1
pub struct FakeFtpServer {
    pub port: u16,
    pub files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    pub commands: Arc<Mutex<Vec<String>>>,
    handle: Option<JoinHandle<()>>,
}

impl FakeFtpServer {
    pub fn start() -> Self {
        Self::with_behavior(ServerBehavior::default())
    }

    pub fn with_behavior(behavior: ServerBehavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let files = Arc::new(Mutex::new(HashMap::new()));
        let commands = Arc::new(Mutex::new(Vec::new()));

        let (files_ref, commands_ref) = (files.clone(), commands.clone());
        let handle = thread::spawn(move || {
            if let Ok((stream, _)) = listener.accept() {
                serve(stream, &behavior, &files_ref, &commands_ref);
            }
        });

        Self {
            port,
            files,
            commands,
            handle: Some(handle),
        }
    }

    /// Waits for the session to end
    pub fn join(mut self) -> Self {
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap();
        }
        self
    }

    pub fn stored(&self, remote_path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(remote_path).cloned()
    }

    pub fn received(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

fn serve(
    stream: TcpStream,
    behavior: &ServerBehavior,
    files: &Mutex<HashMap<String, Vec<u8>>>,
    commands: &Mutex<Vec<String>>,
) {
    let mut writer = stream.try_clone().unwrap();
    let mut reader = BufReader::new(stream);
    let reply = |writer: &mut TcpStream, line: &str| {
        let _ = writer.write_all(format!("{}\r\n", line).as_bytes());
    };

    reply(&mut writer, &behavior.greeting);
    if !behavior.greeting.starts_with("220") {
        return;
    }

    let mut data_listener: Option<TcpListener> = None;
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let line = line.trim_end().to_string();
        let (command, arg) = match line.split_once(' ') {
            Some((c, a)) => (c.to_string(), a.to_string()),
            None => (line.clone(), String::new()),
        };
        commands.lock().unwrap().push(command.clone());

        match command.as_str() {
            "USER" => reply(&mut writer, "331 Password required"),
            "PASS" if arg == PASSWORD => reply(&mut writer, "230 Logged in"),
            "PASS" => reply(&mut writer, "530 Login incorrect"),
            "TYPE" => reply(&mut writer, &format!("200 Type set to {}", arg)),
            "PASV" => {
                let listener = TcpListener::bind("127.0.0.1:0").unwrap();
                let port = listener.local_addr().unwrap().port();
                data_listener = Some(listener);
                reply(
                    &mut writer,
                    &format!(
                        "227 Entering Passive Mode (127,0,0,1,{},{})",
                        port / 256,
                        port % 256
                    ),
                );
            }
            "STOR" => {
                if let Some(custom) = &behavior.stor_reply {
                    reply(&mut writer, custom);
                    continue;
                }
                let Some(listener) = data_listener.take() else {
                    reply(&mut writer, "425 Use PASV first");
                    continue;
                };
                reply(&mut writer, "150 Opening BINARY mode data connection");
                let (mut data, _) = listener.accept().unwrap();
                let mut contents = Vec::new();
                data.read_to_end(&mut contents).unwrap();
                files.lock().unwrap().insert(arg, contents);
                reply(&mut writer, "226 Transfer complete");
            }
            "QUIT" => {
                reply(&mut writer, "221 Goodbye");
                return;
            }
            _ => reply(&mut writer, "502 Command not implemented"),
        }
    }
}
