//! Phar writer: stub, manifest, uncompressed entries and a SHA-256 signature

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};

use super::ArchiveLayout;

const MANIFEST_API_VERSION: [u8; 2] = [0x11, 0x00];
const FLAG_HAS_SIGNATURE: u32 = 0x0001_0000;
const SIGNATURE_SHA256: u32 = 0x0003;
const SIGNATURE_MAGIC: &[u8; 4] = b"GBMB";
const ENTRY_PERMISSIONS: u32 = 0o644;

/// Stub, alias and metadata of a phar
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PharOptions {
    /// PHP code run before `__HALT_COMPILER()` when the archive is executed
    pub stub: String,
    pub alias: String,
    pub metadata: BTreeMap<String, String>,
}

/// Serialize `layout` as a phar; identical inputs give identical bytes
pub fn write_phar<W: Write>(
    layout: &ArchiveLayout,
    options: &PharOptions,
    mut writer: W,
) -> io::Result<W> {
    let mut out = Vec::new();
    out.extend_from_slice(b"<?php ");
    out.extend_from_slice(options.stub.as_bytes());
    out.extend_from_slice(b" __HALT_COMPILER(); ?>\r\n");

    let mut entries = Vec::new();
    let mut contents = Vec::new();
    for entry in layout.entries() {
        let data = fs::read(&entry.source)?;
        let size = len_u32(data.len())?;
        put_bytes(&mut entries, entry.destination.as_bytes())?;
        put_u32(&mut entries, size);
        put_u32(&mut entries, 0); // timestamp
        put_u32(&mut entries, size); // stored uncompressed
        put_u32(&mut entries, crc32fast::hash(&data));
        put_u32(&mut entries, ENTRY_PERMISSIONS);
        put_u32(&mut entries, 0); // no per-file metadata
        contents.extend_from_slice(&data);
    }

    let metadata = serialize_metadata(&options.metadata);
    let mut manifest = Vec::new();
    put_u32(&mut manifest, len_u32(layout.len())?);
    manifest.extend_from_slice(&MANIFEST_API_VERSION);
    put_u32(&mut manifest, FLAG_HAS_SIGNATURE);
    put_bytes(&mut manifest, options.alias.as_bytes())?;
    if metadata.is_empty() {
        put_u32(&mut manifest, 0);
    } else {
        put_bytes(&mut manifest, metadata.as_bytes())?;
    }
    manifest.extend_from_slice(&entries);

    put_u32(&mut out, len_u32(manifest.len())?);
    out.extend_from_slice(&manifest);
    out.extend_from_slice(&contents);

    let digest = Sha256::digest(&out);
    out.extend_from_slice(&digest);
    put_u32(&mut out, SIGNATURE_SHA256);
    out.extend_from_slice(SIGNATURE_MAGIC);

    writer.write_all(&out)?;
    Ok(writer)
}

/// `a:N:{s:len:"key";s:len:"value";...}`, lengths in bytes
fn serialize_metadata(metadata: &BTreeMap<String, String>) -> String {
    if metadata.is_empty() {
        return String::new();
    }
    let mut out = format!("a:{}:{{", metadata.len());
    for (key, value) in metadata {
        out.push_str(&format!("s:{}:\"{}\";s:{}:\"{}\";", key.len(), key, value.len(), value));
    }
    out.push('}');
    out
}

fn len_u32(len: usize) -> io::Result<u32> {
    u32::try_from(len)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "phar section exceeds 4 GiB"))
}

fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) -> io::Result<()> {
    put_u32(buf, len_u32(bytes.len())?);
    buf.extend_from_slice(bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IncludePath;

    #[test]
    fn test_metadata_serialization() {
        let mut metadata = BTreeMap::new();
        metadata.insert("version".to_string(), "1.2".to_string());
        metadata.insert("author".to_string(), "Zoë".to_string());
        assert_eq!(
            serialize_metadata(&metadata),
            "a:2:{s:6:\"author\";s:4:\"Zoë\";s:7:\"version\";s:3:\"1.2\";}"
        );
        assert_eq!(serialize_metadata(&BTreeMap::new()), "");
    }

    #[test]
    fn test_phar_structure() {
        let dir = tempfile::TempDir::new().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("index.php"), "<?php echo 'hi';").unwrap();
        let layout =
            ArchiveLayout::plan(&IncludePath::default(), &[src], &BTreeMap::new()).unwrap();
        let options = PharOptions {
            stub: "Phar::mapPhar('app.phar');".to_string(),
            alias: "app.phar".to_string(),
            metadata: BTreeMap::new(),
        };

        let bytes = write_phar(&layout, &options, Vec::new()).unwrap();
        let stub = b"<?php Phar::mapPhar('app.phar'); __HALT_COMPILER(); ?>\r\n";
        assert!(bytes.starts_with(stub));
        assert!(bytes.ends_with(b"\x03\x00\x00\x00GBMB"));

        let manifest_len =
            u32::from_le_bytes(bytes[stub.len()..stub.len() + 4].try_into().unwrap());
        let manifest = &bytes[stub.len() + 4..stub.len() + 4 + manifest_len as usize];
        assert_eq!(u32::from_le_bytes(manifest[0..4].try_into().unwrap()), 1);
        assert_eq!(&manifest[4..6], &MANIFEST_API_VERSION);
        assert_eq!(u32::from_le_bytes(manifest[10..14].try_into().unwrap()), 8);
        assert_eq!(&manifest[14..22], b"app.phar");

        let data_start = stub.len() + 4 + manifest_len as usize;
        let payload = b"<?php echo 'hi';";
        assert_eq!(&bytes[data_start..data_start + payload.len()], payload);

        let signed = &bytes[..data_start + payload.len()];
        let signature = &bytes[data_start + payload.len()..bytes.len() - 8];
        assert_eq!(signature, Sha256::digest(signed).as_slice());
    }
}
