//! # Layer Manager

use std::sync::Arc;

use super::model::Layer;
use crate::store::{LayerRepository, StoreHandle, StoreResult};

pub struct LayerManager {
    layers: Arc<dyn LayerRepository>,
}

impl LayerManager {
    pub fn new(store: &StoreHandle) -> Self {
        Self {
            layers: store.layers.clone(),
        }
    }

    /// Every layer, ordered by id
    pub async fn get_all_layers(&self) -> StoreResult<Vec<Layer>> {
        self.layers.find_all_layers().await
    }
}
