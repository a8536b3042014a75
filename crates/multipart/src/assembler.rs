use std::path::{Path, PathBuf};

use md5::{Digest as _, Md5};
use sha2::Sha256;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWrite, AsyncWriteExt};

use crate::types::PartInfo;

/// Where an uploaded part's bytes live until completion assembles them,
/// mirroring `tgts3mpt.go`'s `uploadID + "." + partNum` workfile naming.
pub fn part_workfile_path(dir: &Path, upload_id: &str, part_number: u32, key: &str) -> PathBuf {
    dir.join(format!("{upload_id}.{part_number}.{key}"))
}

/// Where the assembled (but not yet promoted-to-final) object lives during
/// completion, mirroring the `uploadID + ".complete"` prefix.
pub fn complete_workfile_path(dir: &Path, upload_id: &str, key: &str) -> PathBuf {
    dir.join(format!("{upload_id}.complete.{key}"))
}

pub struct PartWriteResult {
    pub size: u64,
    /// Lowercase hex MD5, bare (unquoted) — the ETag convention.
    pub md5_hex: String,
    pub sha256_hex: Option<String>,
}

/// Streams `reader` to `path`, hashing as it goes. MD5 is always computed
/// (it is the part ETag); SHA-256 is computed too when `compute_sha256` asks
/// for end-to-end integrity checking against a caller-supplied checksum.
pub async fn write_part(path: &Path, mut reader: impl AsyncRead + Unpin, compute_sha256: bool) -> std::io::Result<PartWriteResult> {
    let mut file = fs::File::create(path).await?;
    let mut md5 = Md5::new();
    let mut sha256 = compute_sha256.then(Sha256::new);
    let mut buf = vec![0u8; 256 * 1024];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        md5.update(&buf[..n]);
        if let Some(h) = sha256.as_mut() {
            h.update(&buf[..n]);
        }
        file.write_all(&buf[..n]).await?;
        total += n as u64;
    }
    file.flush().await?;
    Ok(PartWriteResult {
        size: total,
        md5_hex: hex_simd::encode_to_string(md5.finalize(), hex_simd::AsciiCase::Lower),
        sha256_hex: sha256.map(|h| hex_simd::encode_to_string(h.finalize(), hex_simd::AsciiCase::Lower)),
    })
}

pub struct AssembledObject {
    pub size: u64,
    /// Lowercase hex MD5 of the full concatenated object -- not the
    /// composite ETag, which hashes the per-part digests instead.
    pub content_md5_hex: String,
}

/// Concatenates `parts` (already validated and ordered by the registry) from
/// their workfiles into `dest`, hashing the full object as it streams
/// through so the caller can persist a content digest without a second pass.
pub async fn assemble_parts(dir: &Path, upload_id: &str, key: &str, parts: &[PartInfo], dest: &Path) -> std::io::Result<AssembledObject> {
    let mut out = fs::File::create(dest).await?;
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; 256 * 1024];
    let mut total = 0u64;
    for part in parts {
        let src_path = part_workfile_path(dir, upload_id, part.part_number, key);
        let mut src = fs::File::open(&src_path).await?;
        loop {
            let n = src.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            out.write_all(&buf[..n]).await?;
            total += n as u64;
        }
    }
    out.flush().await?;
    Ok(AssembledObject {
        size: total,
        content_md5_hex: hex_simd::encode_to_string(hasher.finalize(), hex_simd::AsciiCase::Lower),
    })
}

/// Publishes the assembled workfile as the bucket's object: fsyncs it (when
/// asked) then renames it into place, creating the destination directory if
/// needed. Mirrors the atomic temp-then-rename idiom the metadata store uses
/// for metafiles.
pub async fn publish_object(assembled_path: &Path, final_path: &Path, fsync: bool) -> std::io::Result<()> {
    if fsync {
        fs::File::open(assembled_path).await?.sync_all().await?;
    }
    if let Some(parent) = final_path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::rename(assembled_path, final_path).await
}

/// Composite ETag: `hex(md5(concat(part md5 bytes)))-{part count}`, per the
/// S3 multipart ETag convention.
pub fn composite_etag(parts: &[PartInfo]) -> String {
    let mut hasher = Md5::new();
    for part in parts {
        if let Ok(raw) = hex_simd::decode_to_vec(part.etag.as_bytes()) {
            hasher.update(&raw);
        }
    }
    format!("{}-{}", hex_simd::encode_to_string(hasher.finalize(), hex_simd::AsciiCase::Lower), parts.len())
}

/// Returns the `(offset, size)` byte range occupied by `part_number` within
/// the completed object, assuming `parts` is sorted ascending by part
/// number — the Rust counterpart of `s3.OffsetSorted`.
pub fn offset_sorted(parts: &[PartInfo], part_number: u32) -> Option<(u64, u64)> {
    let mut offset = 0u64;
    for part in parts {
        if part.part_number == part_number {
            return Some((offset, part.size));
        }
        offset += part.size;
    }
    None
}

/// Streams the byte range for one part out of the completed object file,
/// the counterpart of `s3.GetPart` / `getMptPart`.
pub async fn get_part(object_path: &Path, offset: u64, size: u64, writer: &mut (impl AsyncWrite + Unpin)) -> std::io::Result<()> {
    let mut file = fs::File::open(object_path).await?;
    file.seek(std::io::SeekFrom::Start(offset)).await?;
    let mut remaining = size;
    let mut buf = vec![0u8; 256 * 1024];
    while remaining > 0 {
        let want = remaining.min(buf.len() as u64) as usize;
        let n = file.read(&mut buf[..want]).await?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n]).await?;
        remaining -= n as u64;
    }
    Ok(())
}

pub async fn remove_part_workfiles(dir: &Path, upload_id: &str, key: &str, parts: &[PartInfo]) {
    for part in parts {
        let _ = fs::remove_file(part_workfile_path(dir, upload_id, part.part_number, key)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(n: u32, size: u64, etag: &str) -> PartInfo {
        PartInfo {
            part_number: n,
            size,
            etag: etag.to_string(),
            sha256: None,
        }
    }

    #[tokio::test]
    async fn write_part_computes_md5_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("part");
        let result = write_part(&path, b"hello world".as_slice(), true).await.unwrap();
        assert_eq!(result.size, 11);
        assert!(result.sha256_hex.is_some());
        assert_eq!(result.md5_hex.len(), 32);
    }

    #[tokio::test]
    async fn assemble_concatenates_parts_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let upload_id = "up1";
        let key = "obj";
        let r1 = write_part(&part_workfile_path(dir.path(), upload_id, 1, key), b"abc".as_slice(), false)
            .await
            .unwrap();
        let r2 = write_part(&part_workfile_path(dir.path(), upload_id, 2, key), b"defgh".as_slice(), false)
            .await
            .unwrap();
        let parts = vec![part(1, r1.size, &r1.md5_hex), part(2, r2.size, &r2.md5_hex)];
        let dest = dir.path().join("assembled");
        let assembled = assemble_parts(dir.path(), upload_id, key, &parts, &dest).await.unwrap();
        assert_eq!(assembled.size, 8);
        assert_eq!(assembled.content_md5_hex.len(), 32);
        let contents = fs::read(&dest).await.unwrap();
        assert_eq!(contents, b"abcdefgh");
    }

    #[tokio::test]
    async fn publish_object_renames_into_a_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        let assembled = dir.path().join("assembled");
        fs::write(&assembled, b"payload").await.unwrap();

        let final_path = dir.path().join("nested/obj");
        publish_object(&assembled, &final_path, true).await.unwrap();

        assert!(!assembled.exists());
        assert_eq!(fs::read(&final_path).await.unwrap(), b"payload");
    }

    #[test]
    fn offset_sorted_accumulates_preceding_sizes() {
        let parts = vec![part(1, 10, "a"), part(2, 20, "b"), part(3, 5, "c")];
        assert_eq!(offset_sorted(&parts, 1), Some((0, 10)));
        assert_eq!(offset_sorted(&parts, 2), Some((10, 20)));
        assert_eq!(offset_sorted(&parts, 3), Some((30, 5)));
        assert_eq!(offset_sorted(&parts, 4), None);
    }

    #[tokio::test]
    async fn get_part_reads_the_right_byte_range() {
        let dir = tempfile::tempdir().unwrap();
        let object_path = dir.path().join("object");
        fs::write(&object_path, b"abcdefgh").await.unwrap();
        let mut out = Vec::new();
        get_part(&object_path, 3, 4, &mut out).await.unwrap();
        assert_eq!(out, b"defg");
    }

    #[test]
    fn composite_etag_matches_s3_convention() {
        let parts = vec![part(1, 0, "9bb58f26192e4ba00f01e2e7b136bbd8"), part(2, 0, "9bb58f26192e4ba00f01e2e7b136bbd8")];
        let etag = composite_etag(&parts);
        assert!(etag.ends_with("-2"));
        assert_eq!(etag.len(), 32 + 2);
    }
}
