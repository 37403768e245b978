use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::constants::MAX_BODY_BYTES;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    GET,
    POST,
    PUT,
}

impl TryFrom<&str> for Method {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, anyhow::Error> {
        match value {
            "GET" => Ok(Method::GET),
            "POST" => Ok(Method::POST),
            "PUT" => Ok(Method::PUT),
            _ => Err(anyhow::anyhow!("Method not supported")),
        }
    }
}

#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

impl Request {
    /// Read one HTTP/1.1 request: the head up to the blank line, then
    /// `Content-Length` bytes of body.
    pub async fn new<Reader: AsyncRead + Unpin>(mut reader: Reader) -> Result<Self> {
        let mut buf: Vec<u8> = Vec::with_capacity(1024);
        let mut chunk = [0u8; 1024];

        let head_end = loop {
            if let Some(pos) = find_head_end(&buf) {
                break pos;
            }
            if buf.len() > MAX_BODY_BYTES {
                bail!("Request head too large");
            }
            let n = reader.read(&mut chunk).await.context("Read Error")?;
            if n == 0 {
                bail!("Connection closed before end of head");
            }
            buf.extend_from_slice(&chunk[..n]);
        };

        let head = std::str::from_utf8(&buf[..head_end]).context("Head is not utf-8")?;
        let mut head_line = head.lines();
        let first = head_line.next().context("Empty Request")?;
        let mut request_parts = first.split_whitespace();
        let method: Method = request_parts
            .next()
            .ok_or(anyhow::anyhow!("missing method"))
            .and_then(TryInto::try_into)
            .context("Missing Method")?;
        let target = request_parts.next().context("No Path")?;
        let path = target.split('?').next().unwrap_or(target).to_string();

        // Headers
        let mut headers = HashMap::new();
        for line in head_line {
            if let Some((k, v)) = line.split_once(":") {
                headers.insert(k.trim().to_lowercase(), v.trim().to_string());
            }
        }

        let content_length = match headers.get("content-length") {
            Some(len) => len.parse::<usize>().context("Invalid Content-Length")?,
            None => 0,
        };
        if content_length > MAX_BODY_BYTES {
            bail!("Body too large: {} bytes", content_length);
        }

        // Body
        let mut body = buf.split_off(head_end + 4);
        while body.len() < content_length {
            let n = reader.read(&mut chunk).await.context("Read Error")?;
            if n == 0 {
                bail!("Connection closed before end of body");
            }
            body.extend_from_slice(&chunk[..n]);
        }
        body.truncate(content_length);

        Ok(Request {
            method,
            path,
            headers,
            body: String::from_utf8(body).context("Body is not utf-8")?,
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}
