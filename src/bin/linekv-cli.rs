//! LineKV interactive client
//!
//! A thin terminal loop over the line protocol: read a command from stdin,
//! send it with a trailing newline, print whatever the server sends back.
//! Closing stdin (Ctrl+D) sends `QUIT` before exiting so the server side
//! tears the connection down cleanly.

use anyhow::Context;
use bytes::BytesMut;
use std::io::{self, Write};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Positional arguments, like the server's own defaults: [host] [port]
    let args: Vec<String> = std::env::args().collect();
    let host = args
        .get(1)
        .cloned()
        .unwrap_or_else(|| linekv::DEFAULT_HOST.to_string());
    let port: u16 = match args.get(2) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("invalid port number '{raw}'"))?,
        None => linekv::DEFAULT_PORT,
    };
    let addr = format!("{host}:{port}");

    println!("Connecting to LineKV server at {addr}...");
    let mut stream = TcpStream::connect(&addr)
        .await
        .with_context(|| format!("connection refused - is the server running at {addr}?"))?;
    println!("Connected! Type 'QUIT' to exit.");

    let stdin = io::stdin();
    let mut input = String::new();

    loop {
        print!("{addr}> ");
        io::stdout().flush()?;

        input.clear();
        if stdin.read_line(&mut input)? == 0 {
            // EOF on stdin: tell the server we are leaving
            println!();
            stream.write_all(b"QUIT\n").await?;
            if let Some(reply) = read_chunk(&mut stream).await? {
                print!("{reply}");
            }
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        stream.write_all(format!("{line}\n").as_bytes()).await?;

        match read_chunk(&mut stream).await? {
            Some(reply) => print!("{reply}"),
            None => {
                println!("Connection closed by server.");
                break;
            }
        }

        if line.eq_ignore_ascii_case("quit") {
            break;
        }
    }

    println!("Closing connection.");
    Ok(())
}

/// Reads one chunk of response data; `None` means the server closed.
///
/// Replies are newline-terminated, so for interactive use a single read is
/// almost always one whole reply (multi-line LRANGE output included).
async fn read_chunk(stream: &mut TcpStream) -> anyhow::Result<Option<String>> {
    let mut buf = BytesMut::with_capacity(4096);
    let n = stream.read_buf(&mut buf).await?;
    if n == 0 {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&buf).to_string()))
}
