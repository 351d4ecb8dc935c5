//! The CARv1 header: `{version, roots}` encoded as dag-cbor.

use cid::Cid;
use serde::{Deserialize, Serialize};

use crate::error::CarError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarHeader {
    pub version: u64,
    pub roots: Vec<Cid>,
}

impl CarHeader {
    pub fn new(root: Cid) -> Self {
        Self {
            version: 1,
            roots: vec![root],
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CarError> {
        serde_ipld_dagcbor::to_vec(self).map_err(|e| CarError::HeaderInvalid(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CarError> {
        let header: Self =
            serde_ipld_dagcbor::from_slice(bytes).map_err(|e| CarError::HeaderInvalid(e.to_string()))?;
        if header.version != 1 {
            return Err(CarError::HeaderInvalid(format!(
                "unsupported CAR version {}",
                header.version
            )));
        }
        Ok(header)
    }

    pub fn root(&self) -> Option<&Cid> {
        self.roots.first()
    }
}
