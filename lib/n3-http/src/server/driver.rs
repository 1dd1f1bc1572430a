/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::net::SocketAddr;

use http::StatusCode;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::time::timeout;

use n3_io_ext::{LimitedWriteExt, StreamCopy, StreamCopyConfig, StreamCopyError};

use super::{HttpServerConfig, recv_request_head};
use crate::body::{
    Body, ChunkedEncodeTransfer, CompressEncodeReader, HttpBodyType, IncomingBodyReader,
    body_error_status,
};
use crate::build::{H1Builder, OutgoingBodyPlan, PeerRequestInfo};
use crate::header::{HeaderMap, connection_value_has_token};
use crate::message::{Request, Response};

/// Per-connection facts handed to the application with each request.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionContext {
    pub peer_addr: Option<SocketAddr>,
    pub local_addr: Option<SocketAddr>,
    served_requests: usize,
}

impl ConnectionContext {
    pub fn new(peer_addr: Option<SocketAddr>, local_addr: Option<SocketAddr>) -> Self {
        ConnectionContext {
            peer_addr,
            local_addr,
            served_requests: 0,
        }
    }

    /// Requests already answered on this connection.
    pub fn served_requests(&self) -> usize {
        self.served_requests
    }
}

/// The application side of the serve loop.
pub trait HttpServerHandler {
    /// Answer one request. The request body borrows the connection and
    /// must be consumed before the response body starts streaming.
    fn serve_request(
        &self,
        req: Request<'_>,
        ctx: &ConnectionContext,
    ) -> impl Future<Output = io::Result<Response<'static>>> + Send;

    /// Answer a framing or parse failure that happened before a request
    /// object existed.
    fn serve_error(
        &self,
        status: StatusCode,
        _ctx: &ConnectionContext,
    ) -> impl Future<Output = Response<'static>> + Send {
        async move { plain_error_response(status) }
    }
}

/// A plain-text response carrying just the status line text.
pub fn plain_error_response(status: StatusCode) -> Response<'static> {
    let text = format!(
        "{} {}\n",
        status.as_u16(),
        status.canonical_reason().unwrap_or("")
    );
    let mut headers = HeaderMap::new();
    headers.set_internal("Content-Type", "text/plain");
    Response::new(status)
        .with_headers(headers)
        .with_body(Body::buffer(text))
}

/// Drives one connection through sequential request/response cycles until
/// the negotiated persistence ends or the peer goes away.
pub struct H1Driver<H> {
    config: HttpServerConfig,
    builder: H1Builder,
    copy_config: StreamCopyConfig,
    handler: H,
    ctx: ConnectionContext,
}

impl<H> H1Driver<H>
where
    H: HttpServerHandler,
{
    pub fn new(config: HttpServerConfig, handler: H) -> Self {
        let builder = H1Builder::new(config.builder.clone());
        let mut copy_config = StreamCopyConfig::default();
        copy_config.set_buffer_size(config.hwm);
        H1Driver {
            config,
            builder,
            copy_config,
            handler,
            ctx: ConnectionContext::default(),
        }
    }

    pub fn with_context(mut self, ctx: ConnectionContext) -> Self {
        self.ctx = ctx;
        self
    }

    /// Serve the connection until close. Returns an error only for IO
    /// failures that leave the connection unusable.
    pub async fn serve<R, W>(mut self, reader: R, mut writer: W) -> io::Result<()>
    where
        R: AsyncRead + Send + Unpin,
        W: AsyncWrite + Send + Unpin,
    {
        let mut reader = BufReader::with_capacity(self.config.hwm, reader);
        while self.serve_one(&mut reader, &mut writer).await? {}
        Ok(())
    }

    async fn serve_one<R, W>(
        &mut self,
        reader: &mut BufReader<R>,
        writer: &mut W,
    ) -> io::Result<bool>
    where
        R: AsyncRead + Send + Unpin,
        W: AsyncWrite + Send + Unpin,
    {
        let head_timeout = if self.ctx.served_requests == 0 {
            self.config.timeout
        } else {
            self.builder.config().keep_alive_timeout
        };
        let head = match timeout(head_timeout, recv_request_head(reader, &self.config.head)).await
        {
            Err(_) => {
                if self.ctx.served_requests == 0 {
                    let rsp = self
                        .handler
                        .serve_error(StatusCode::REQUEST_TIMEOUT, &self.ctx)
                        .await;
                    self.send_final_response(rsp, writer).await?;
                }
                // an idle keep-alive connection expiring is not an error
                return Ok(false);
            }
            Ok(Err(e)) => {
                if let Some(status) = e.status_code() {
                    let rsp = self.handler.serve_error(status, &self.ctx).await;
                    self.send_final_response(rsp, writer).await?;
                }
                return Ok(false);
            }
            Ok(Ok(head)) => head,
        };

        let peer = PeerRequestInfo::from_request(&head);

        let framing = self
            .builder
            .incoming_request_body_type(head.headers(), head.method())
            .and_then(|body_type| {
                let codec = self.builder.incoming_encoding(head.headers())?;
                Ok((body_type, codec))
            });
        let (body_type, codec) = match framing {
            Ok(v) => v,
            Err(e) => {
                let rsp = self.handler.serve_error(e.status(), &self.ctx).await;
                self.send_final_response(rsp, writer).await?;
                return Ok(false);
            }
        };

        let mut body_chain = IncomingBodyReader::new(
            reader,
            body_type,
            codec,
            self.config.body_line_max_size,
            self.config.max_decode_size,
        );
        let req = head.with_body(Body::Reader(&mut body_chain));

        let rsp = match self.handler.serve_request(req, &self.ctx).await {
            Ok(rsp) => rsp,
            Err(e) => {
                let status = body_error_status(&e).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    log::error!("request handler failed: {e}");
                }
                self.handler.serve_error(status, &self.ctx).await
            }
        };

        // an undrained request body means the next head would start
        // somewhere inside it
        let body_finished = body_chain.finished();

        self.ctx.served_requests += 1;
        let force_close = !body_finished
            || self.ctx.served_requests >= self.builder.config().keep_alive_max;
        let (rsp, plan) = self.builder.build_outgoing_response(rsp, &peer, force_close);
        self.write_response(rsp, plan, writer).await
    }

    async fn send_final_response<W>(
        &self,
        rsp: Response<'static>,
        writer: &mut W,
    ) -> io::Result<()>
    where
        W: AsyncWrite + Send + Unpin,
    {
        let peer = PeerRequestInfo {
            version: http::Version::HTTP_11,
            keep_alive_requested: false,
            accept_gzip: false,
            accept_deflate: false,
        };
        let (rsp, plan) = self.builder.build_outgoing_response(rsp, &peer, true);
        self.write_response(rsp, plan, writer).await?;
        Ok(())
    }

    /// Write the head and move the body per plan. Returns whether the
    /// response negotiated keep-alive.
    async fn write_response<W>(
        &self,
        mut rsp: Response<'_>,
        plan: OutgoingBodyPlan,
        writer: &mut W,
    ) -> io::Result<bool>
    where
        W: AsyncWrite + Send + Unpin,
    {
        let keep_alive = rsp
            .headers()
            .get_line("Connection")
            .is_some_and(|v| connection_value_has_token(&v, "keep-alive"));

        let head = rsp.serialize_head();
        timeout(self.config.timeout, writer.write_all_flush(&head))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "write response head"))??;

        let mut body = rsp.take_body();
        match plan.framing {
            HttpBodyType::ContentLength(0) => {}
            HttpBodyType::ContentLength(_) | HttpBodyType::ReadUntilEnd => {
                let copy = StreamCopy::new(&mut body, writer, &self.copy_config);
                self.run_body_transfer(copy).await?;
            }
            HttpBodyType::Chunked => {
                let yield_size = self.copy_config.yield_size();
                if let Some(codec) = plan.encode {
                    let encoder =
                        CompressEncodeReader::new(body, codec, self.builder.compression_level());
                    let mut buf_body = BufReader::with_capacity(self.config.hwm, encoder);
                    let transfer = ChunkedEncodeTransfer::new(&mut buf_body, writer, yield_size);
                    self.run_body_transfer(transfer).await?;
                } else {
                    let mut buf_body = BufReader::with_capacity(self.config.hwm, body);
                    let transfer = ChunkedEncodeTransfer::new(&mut buf_body, writer, yield_size);
                    self.run_body_transfer(transfer).await?;
                }
            }
        }
        Ok(keep_alive)
    }

    async fn run_body_transfer<F>(&self, transfer: F) -> io::Result<()>
    where
        F: Future<Output = Result<u64, StreamCopyError>>,
    {
        match timeout(self.config.timeout, transfer).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(StreamCopyError::ReadFailed(e))) => Err(e),
            Ok(Err(StreamCopyError::WriteFailed(e))) => Err(e),
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "write response body",
            )),
        }
    }
}
