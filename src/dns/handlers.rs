use crate::dns::resolver::Resolver;
use crate::error::Error;
use std::sync::Arc;
use tracing::{error, info, warn};
use trust_dns_server::authority::MessageResponseBuilder;
use trust_dns_server::client::op::{Header, MessageType, OpCode, ResponseCode};
use trust_dns_server::client::rr::{Record, RecordType};
use trust_dns_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};

#[derive(Clone)]
pub struct Handler {
    resolver: Arc<Resolver>,
}

impl Handler {
    #[must_use]
    pub fn new(resolver: Arc<Resolver>) -> Self {
        Handler { resolver }
    }

    async fn dispatch_request<R: ResponseHandler>(
        &self,
        request: &Request,
        response: R,
    ) -> Result<ResponseInfo, Error> {
        // If it isn't a query, return NOTIMPL.
        if request.op_code() != OpCode::Query || request.message_type() != MessageType::Query {
            return self.handle_notimpl(request, response).await;
        }

        let answer = self.answer(request);
        self.send_resp(request, response, answer).await
    }

    /// Answer the question if it's an `A` question that resolves. Messages with more than one
    /// question never get here, they're answered FORMERR by the server.
    fn answer(&self, request: &Request) -> Option<Record> {
        let query = request.query();
        if query.query_type() != RecordType::A {
            return None;
        }
        let remote = request.src();
        // owner name as asked, case included
        let name = query.original().name();
        info!(q = %name, remote = %remote, "query");
        match self.resolver.resolve(name, remote) {
            Ok(record) => record,
            Err(err) => {
                warn!(q = %name, error = %err, "unable to build answer");
                None
            }
        }
    }

    async fn handle_notimpl<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> Result<ResponseInfo, Error> {
        let response = MessageResponseBuilder::from_message_request(request);
        Ok(response_handle
            .send_response(response.error_msg(request.header(), ResponseCode::NotImp))
            .await?)
    }

    async fn send_resp<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
        answer: Option<Record>,
    ) -> Result<ResponseInfo, Error> {
        let records: Vec<Record> = answer.into_iter().collect();
        let mut header = Header::response_from_request(request.header());
        header.set_authoritative(true);
        let builder = MessageResponseBuilder::from_message_request(request);
        let response = builder.build(header, records.iter(), &[], &[], &[]);
        Ok(response_handle.send_response(response).await?)
    }
}

#[async_trait::async_trait]
impl RequestHandler for Handler {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        response_handle: R,
    ) -> ResponseInfo {
        match self.dispatch_request(request, response_handle).await {
            Ok(info) => info,
            Err(error) => {
                error!("error in RequestHandler: {:?}", error);
                let mut header = Header::new();
                header.set_response_code(ResponseCode::ServFail);
                header.into()
            }
        }
    }
}
