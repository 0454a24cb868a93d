use crate::api::routes;
use crate::config::SharedConfig;
use crate::index::ActiveIndex;
use std::future::Future;

#[derive(Clone)]
pub(super) struct AppState {
    pub index: ActiveIndex,
}

pub fn new(config: &SharedConfig, index: ActiveIndex) -> impl Future<Output = hyper::Result<()>> {
    axum::Server::bind(&config.api_bind_addr)
        .serve(routes::new(AppState { index }, config.api_timeout).into_make_service())
}
