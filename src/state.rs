use std::sync::Arc;

use crate::{
    config::Config,
    store::{UserStore, VideoStore},
    utils::media::MediaUploader,
};

/// Everything a handler may touch, injected once at startup.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub videos: Arc<dyn VideoStore>,
    pub media: Arc<dyn MediaUploader>,
    pub config: Config,
}
