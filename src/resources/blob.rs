//! Per-decode store for internal `blob:` buffer references.
//!
//! Some exporters write buffers (and the images inside them) as
//! `blob:<origin>:<id>` URIs that only make sense inside the process that
//! produced them. Their bytes are packaged with the model; each such buffer
//! carries a `byteOffset`/`byteLength` into the package. The store maps every
//! id to those bytes so buffers and images can be resolved without any file or
//! network access. It lives exactly as long as one decode.

use std::collections::HashMap;

use crate::resources::uri::blob_id_of;

#[derive(Debug, Default)]
pub struct BlobStore {
    blobs: HashMap<String, Vec<u8>>,
}

impl BlobStore {
    /// Collects every `blob:` buffer declared in the glTF `json` document,
    /// slicing its bytes out of `package`.
    ///
    /// Buffers whose range does not fit in `package` are left out; looking
    /// them up later yields `None` and the caller records a missing blob.
    pub fn from_document(json: &[u8], package: &[u8]) -> Self {
        let mut store = Self::default();
        let doc: serde_json::Value = match serde_json::from_slice(json) {
            Ok(doc) => doc,
            Err(e) => {
                log::debug!("blob scan skipped, document is not plain JSON: {}", e);
                return store;
            }
        };
        let Some(buffers) = doc.get("buffers").and_then(|b| b.as_array()) else {
            return store;
        };
        for buffer in buffers {
            let Some(id) = buffer
                .get("uri")
                .and_then(|u| u.as_str())
                .and_then(blob_id_of)
            else {
                continue;
            };
            let offset = buffer
                .get("byteOffset")
                .and_then(|o| o.as_u64())
                .unwrap_or(0) as usize;
            let length = buffer
                .get("byteLength")
                .and_then(|l| l.as_u64())
                .unwrap_or(0) as usize;
            match offset
                .checked_add(length)
                .and_then(|end| package.get(offset..end))
            {
                Some(bytes) => {
                    log::debug!("blob '{}' resolved to {} bytes at offset {}", id, length, offset);
                    store.insert(id, bytes.to_vec());
                }
                None => log::debug!(
                    "blob '{}' range {}+{} lies outside the {} package bytes",
                    id,
                    offset,
                    length,
                    package.len()
                ),
            }
        }
        store
    }

    fn insert(&mut self, id: impl Into<String>, bytes: Vec<u8>) {
        self.blobs.insert(id.into(), bytes);
    }

    pub fn get(&self, id: &str) -> Option<&[u8]> {
        self.blobs.get(id).map(Vec::as_slice)
    }

    pub(crate) fn len(&self) -> usize {
        self.blobs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_blob_buffers_out_of_the_package() {
        let json = br#"{
            "asset": {"version": "2.0"},
            "buffers": [
                {"byteLength": 4},
                {"uri": "blob:nodedata:tex0", "byteOffset": 2, "byteLength": 3},
                {"uri": "blob:nodedata:gone", "byteOffset": 9, "byteLength": 3},
                {"uri": "side.bin", "byteLength": 3}
            ]
        }"#;
        let package = [0u8, 1, 2, 3, 4, 5, 6, 7];
        let store = BlobStore::from_document(json, &package);

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("tex0"), Some(&[2u8, 3, 4][..]));
        assert_eq!(store.get("gone"), None);
    }
}
