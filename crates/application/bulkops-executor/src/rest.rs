use std::sync::Arc;

use bulkops_core::ActionError;
use bulkops_infra::{expand_item_path, Method, RestClient};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::action::ItemAction;

#[derive(Debug, Clone)]
pub enum RequestBody {
    None,
    Fixed(Value),
    /// Sends the selected item itself.
    Item,
}

/// One REST call per item: `{field}` placeholders in the path are filled
/// from the item, so `DELETE /api/eda/v1/event-streams/{id}/` deletes each
/// selected stream.
pub struct RestAction<C: ?Sized> {
    client: Arc<C>,
    method: Method,
    path_template: String,
    body: RequestBody,
    observe_signal: bool,
}

impl<C: RestClient + ?Sized> RestAction<C> {
    pub fn new(client: Arc<C>, method: Method, path_template: impl Into<String>) -> Self {
        Self {
            client,
            method,
            path_template: path_template.into(),
            body: RequestBody::None,
            observe_signal: false,
        }
    }

    pub fn delete(client: Arc<C>, path_template: impl Into<String>) -> Self {
        Self::new(client, Method::DELETE, path_template)
    }

    pub fn patch(client: Arc<C>, path_template: impl Into<String>, body: Value) -> Self {
        Self::new(client, Method::PATCH, path_template).with_body(RequestBody::Fixed(body))
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Lets the run's cancellation abort this item's request mid-flight.
    /// Off by default so a started call is never cut short on the wire.
    pub fn observe_signal(mut self, observe: bool) -> Self {
        self.observe_signal = observe;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn is_destructive(&self) -> bool {
        self.method == Method::DELETE
    }
}

#[async_trait::async_trait]
impl<C> ItemAction<Value> for RestAction<C>
where
    C: RestClient + ?Sized + 'static,
{
    async fn execute(&self, item: Value, signal: CancellationToken) -> Result<Value, ActionError> {
        let url = expand_item_path(&self.path_template, &item)?;
        let body = match &self.body {
            RequestBody::None => None,
            RequestBody::Fixed(v) => Some(v),
            RequestBody::Item => Some(&item),
        };
        let signal = self.observe_signal.then_some(&signal);
        Ok(self
            .client
            .request(self.method.clone(), &url, body, signal)
            .await?)
    }
}
