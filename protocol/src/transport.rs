//! 传输层抽象
//!
//! 服务端使用的最小化 HTTP/1.1 编解码：只支持带 Content-Length 的请求体，不支持 chunked。
//! 服务端通过 Listener/Connection traits 与具体传输实现解耦。

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::error::{ProtocolError, Result};
use crate::{MAX_BODY_SIZE, MAX_HEADER_SIZE};

/// 请求方法
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Other(String),
}

impl Method {
    fn parse(s: &str) -> Self {
        match s {
            "GET" => Method::Get,
            "POST" => Method::Post,
            other => Method::Other(other.to_string()),
        }
    }
}

/// HTTP 请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    /// 不含查询串的路径
    pub path: String,
    pub query: Option<String>,
    /// 头部名称统一为小写
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (target.to_string(), None),
        };
        Self {
            method,
            path,
            query,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// 设置 JSON 消息体
    pub fn with_json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = serde_json::to_vec(body)?;
        self.headers
            .push(("content-type".to_string(), "application/json".to_string()));
        Ok(self)
    }

    /// 获取头部（名称不区分大小写）
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// 解析 JSON 消息体
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// 客户端是否要求关闭连接
    pub fn wants_close(&self) -> bool {
        self.header("connection")
            .is_some_and(|v| v.eq_ignore_ascii_case("close"))
    }
}

/// HTTP 响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// JSON 响应
    pub fn json<T: Serialize>(status: u16, body: &T) -> Result<Self> {
        Ok(Self {
            status,
            content_type: "application/json".to_string(),
            body: serde_json::to_vec(body)?,
        })
    }

    /// 纯文本响应
    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8".to_string(),
            body: body.as_bytes().to_vec(),
        }
    }

    /// 解析 JSON 消息体
    pub fn json_body<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// 状态码对应的原因短语
fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

fn map_eof(e: std::io::Error) -> ProtocolError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        ProtocolError::ConnectionClosed
    } else {
        ProtocolError::Io(e)
    }
}

/// 连接抽象 trait（服务端业务层使用）
#[async_trait]
pub trait Connection: Send {
    /// 接收下一个请求，对端正常关闭时返回 None
    async fn recv_request(&mut self) -> Result<Option<HttpRequest>>;

    /// 发送响应
    async fn send_response(&mut self, response: &HttpResponse, keep_alive: bool) -> Result<()>;

    /// 获取远端地址
    fn peer_addr(&self) -> Option<String>;
}

/// 监听器 trait（服务端使用）
#[async_trait]
pub trait Listener: Send + Sync + Sized {
    type Conn: Connection + 'static;

    /// 绑定地址
    async fn bind(addr: &str) -> Result<Self>;

    /// 接受连接
    async fn accept(&mut self) -> Result<Self::Conn>;

    /// 获取本地地址
    fn local_addr(&self) -> Option<String>;
}

// ============================================================================
// TCP 实现
// ============================================================================

/// TCP 连接
pub struct TcpConnection {
    reader: HttpReader<OwnedReadHalf>,
    writer: HttpWriter<OwnedWriteHalf>,
    peer_addr: Option<String>,
}

impl TcpConnection {
    /// 从 TcpStream 创建
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        stream.set_nodelay(true)?;
        let peer_addr = stream.peer_addr().ok().map(|a| a.to_string());
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: HttpReader::new(read_half),
            writer: HttpWriter::new(write_half),
            peer_addr,
        })
    }
}

#[async_trait]
impl Connection for TcpConnection {
    async fn recv_request(&mut self) -> Result<Option<HttpRequest>> {
        self.reader.read_request().await
    }

    async fn send_response(&mut self, response: &HttpResponse, keep_alive: bool) -> Result<()> {
        self.writer.write_response(response, keep_alive).await
    }

    fn peer_addr(&self) -> Option<String> {
        self.peer_addr.clone()
    }
}

/// TCP 监听器
pub struct TcpListener {
    listener: tokio::net::TcpListener,
}

#[async_trait]
impl Listener for TcpListener {
    type Conn = TcpConnection;

    async fn bind(addr: &str) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(ProtocolError::Io)?;
        Ok(Self { listener })
    }

    async fn accept(&mut self) -> Result<Self::Conn> {
        let (stream, _addr) = self.listener.accept().await.map_err(ProtocolError::Io)?;
        TcpConnection::from_stream(stream)
    }

    fn local_addr(&self) -> Option<String> {
        self.listener.local_addr().ok().map(|a| a.to_string())
    }
}

// ============================================================================
// 报文编解码
// ============================================================================

/// 报文读取器
pub struct HttpReader<R> {
    reader: BufReader<R>,
}

impl<R: AsyncRead + Unpin + Send> HttpReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    /// 读取一个请求，连接在请求之间被关闭时返回 None
    pub async fn read_request(&mut self) -> Result<Option<HttpRequest>> {
        let Some((start_line, headers)) = read_head(&mut self.reader).await? else {
            return Ok(None);
        };

        let mut parts = start_line.split_whitespace();
        let (method, target, version) = match (parts.next(), parts.next(), parts.next()) {
            (Some(method), Some(target), Some(version)) => (method, target, version),
            _ => {
                return Err(ProtocolError::MalformedRequest {
                    reason: format!("bad request line: {start_line:?}"),
                })
            }
        };
        if !version.starts_with("HTTP/1.") {
            return Err(ProtocolError::MalformedRequest {
                reason: format!("unsupported version: {version}"),
            });
        }

        let body = read_body(&mut self.reader, &headers).await?;
        let mut request = HttpRequest::new(Method::parse(method), target);
        request.headers = headers;
        request.body = body;

        Ok(Some(request))
    }
}

/// 读取起始行与头部
async fn read_head<R: AsyncBufRead + Unpin>(
    reader: &mut R,
) -> Result<Option<(String, Vec<(String, String)>)>> {
    let mut consumed = 0;

    let mut start_line = String::new();
    // 跳过报文之间多余的空行
    loop {
        start_line.clear();
        let n = read_line_limited(reader, &mut start_line, MAX_HEADER_SIZE - consumed).await?;
        if n == 0 {
            return if consumed == 0 {
                Ok(None)
            } else {
                Err(ProtocolError::ConnectionClosed)
            };
        }
        consumed += n;
        if !start_line.trim().is_empty() {
            break;
        }
    }

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        let n = read_line_limited(reader, &mut line, MAX_HEADER_SIZE - consumed).await?;
        if n == 0 {
            return Err(ProtocolError::ConnectionClosed);
        }
        consumed += n;

        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            break;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| ProtocolError::MalformedRequest {
                reason: format!("bad header line: {line:?}"),
            })?;
        headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
    }

    Ok(Some((start_line.trim_end().to_string(), headers)))
}

/// 读取一行，超过剩余额度时报错
async fn read_line_limited<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    line: &mut String,
    remaining: usize,
) -> Result<usize> {
    let n = reader
        .take(remaining as u64 + 1)
        .read_line(line)
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::InvalidData {
                ProtocolError::MalformedRequest {
                    reason: "header is not valid UTF-8".to_string(),
                }
            } else {
                ProtocolError::Io(e)
            }
        })?;

    if n > remaining {
        return Err(ProtocolError::HeaderTooLarge {
            max: MAX_HEADER_SIZE,
        });
    }
    if n > 0 && !line.ends_with('\n') {
        return Err(ProtocolError::ConnectionClosed);
    }
    Ok(n)
}

/// 按 Content-Length 读取消息体
async fn read_body<R: AsyncRead + Unpin>(
    reader: &mut R,
    headers: &[(String, String)],
) -> Result<Vec<u8>> {
    if find_header(headers, "transfer-encoding").is_some() {
        return Err(ProtocolError::MalformedRequest {
            reason: "transfer-encoding is not supported".to_string(),
        });
    }

    let length = match find_header(headers, "content-length") {
        Some(value) => value
            .parse::<usize>()
            .map_err(|_| ProtocolError::MalformedRequest {
                reason: format!("bad content-length: {value:?}"),
            })?,
        None => 0,
    };

    if length > MAX_BODY_SIZE {
        return Err(ProtocolError::BodyTooLarge {
            size: length,
            max: MAX_BODY_SIZE,
        });
    }

    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await.map_err(map_eof)?;
    Ok(body)
}

/// 报文写入器
pub struct HttpWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> HttpWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// 写入响应
    pub async fn write_response(&mut self, response: &HttpResponse, keep_alive: bool) -> Result<()> {
        let head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: {}\r\n\r\n",
            response.status,
            reason_phrase(response.status),
            response.content_type,
            response.body.len(),
            if keep_alive { "keep-alive" } else { "close" },
        );

        self.writer.write_all(head.as_bytes()).await?;
        self.writer.write_all(&response.body).await?;
        self.writer.flush().await?;
        Ok(())
    }

}
