use anyhow::{Context, Result};
use serde::Serialize;
use std::{fs, path::PathBuf};

use drive_credentials::crypto::KeyPair;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRecord {
    pub private_key_hex: String,       // 32-byte hex, no 0x
    pub public_key_uncompressed: String, // 04 || X || Y, the form sent as pubKey
}

impl From<&KeyPair> for KeyRecord {
    fn from(kp: &KeyPair) -> Self {
        Self {
            private_key_hex: kp.private_key_hex(),
            public_key_uncompressed: kp.public_key_hex(),
        }
    }
}

pub fn generate(count: u32) -> Vec<KeyRecord> {
    (0..count)
        .map(|_| KeyRecord::from(&KeyPair::generate()))
        .collect()
}

pub fn emit(records: Vec<KeyRecord>, out: Option<PathBuf>) -> Result<()> {
    if let Some(p) = out {
        let json = serde_json::to_string_pretty(&records)?;
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent).ok();
        }
        fs::write(&p, json).with_context(|| format!("writing {}", p.display()))?;
        println!("✓ Wrote {}", p.display());
    } else {
        println!("{}", serde_json::to_string_pretty(&records)?);
    }
    Ok(())
}
