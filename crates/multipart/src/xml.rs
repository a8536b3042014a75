//! S3 XML request/response bodies for the multipart endpoints, encoded with
//! `serde-xml-rs` the way the rest of the pack reaches for `serde` on the
//! wire rather than hand-rolling XML.

use serde::{Deserialize, Serialize};

use crate::registry::UploadsPage;

#[derive(Debug, Serialize)]
#[serde(rename = "InitiateMultipartUploadResult")]
pub struct InitiateMultipartUploadResult {
    #[serde(rename = "Bucket")]
    pub bucket: String,
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "UploadId")]
    pub upload_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "CompleteMultipartUpload")]
pub struct CompleteMultipartUploadRequest {
    #[serde(rename = "Part", default)]
    pub parts: Vec<CompletedPart>,
}

#[derive(Debug, Deserialize)]
pub struct CompletedPart {
    #[serde(rename = "PartNumber")]
    pub part_number: u32,
    #[serde(rename = "ETag")]
    pub etag: String,
}

#[derive(Debug, Serialize)]
#[serde(rename = "CompleteMultipartUploadResult")]
pub struct CompleteMultipartUploadResult {
    #[serde(rename = "Bucket")]
    pub bucket: String,
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "ETag")]
    pub etag: String,
}

#[derive(Debug, Serialize)]
pub struct Part {
    #[serde(rename = "PartNumber")]
    pub part_number: u32,
    #[serde(rename = "Size")]
    pub size: u64,
    #[serde(rename = "ETag")]
    pub etag: String,
}

#[derive(Debug, Serialize)]
#[serde(rename = "ListPartsResult")]
pub struct ListPartsResult {
    #[serde(rename = "Bucket")]
    pub bucket: String,
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "UploadId")]
    pub upload_id: String,
    #[serde(rename = "Part", default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
pub struct Upload {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "UploadId")]
    pub upload_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename = "ListMultipartUploadsResult")]
pub struct ListMultipartUploadsResult {
    #[serde(rename = "Bucket")]
    pub bucket: String,
    #[serde(rename = "IsTruncated")]
    pub is_truncated: bool,
    #[serde(rename = "NextKeyMarker", skip_serializing_if = "Option::is_none")]
    pub next_key_marker: Option<String>,
    #[serde(rename = "NextUploadIdMarker", skip_serializing_if = "Option::is_none")]
    pub next_upload_id_marker: Option<String>,
    #[serde(rename = "Upload", default)]
    pub uploads: Vec<Upload>,
}

impl ListMultipartUploadsResult {
    /// Builds the response body from one `list_uploads` page; `NextKeyMarker`
    /// / `NextUploadIdMarker` are only present when the page was truncated,
    /// per the S3 convention of omitting them on the final page.
    pub fn from_page(bucket: impl Into<String>, page: UploadsPage) -> Self {
        let last = page.is_truncated.then(|| page.uploads.last()).flatten();
        let next_key_marker = last.map(|u| u.key.clone());
        let next_upload_id_marker = last.map(|u| u.upload_id.clone());
        Self {
            bucket: bucket.into(),
            is_truncated: page.is_truncated,
            next_key_marker,
            next_upload_id_marker,
            uploads: page.uploads.into_iter().map(|u| Upload { key: u.key, upload_id: u.upload_id }).collect(),
        }
    }
}

pub fn to_xml<T: Serialize>(value: &T) -> Result<String, serde_xml_rs::Error> {
    serde_xml_rs::to_string(value)
}

pub fn from_xml<T: for<'de> Deserialize<'de>>(body: &str) -> Result<T, serde_xml_rs::Error> {
    serde_xml_rs::from_str(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_request_parses_parts_in_document_order() {
        let body = r#"<CompleteMultipartUpload>
            <Part><PartNumber>1</PartNumber><ETag>"aaa"</ETag></Part>
            <Part><PartNumber>2</PartNumber><ETag>"bbb"</ETag></Part>
        </CompleteMultipartUpload>"#;
        let req: CompleteMultipartUploadRequest = from_xml(body).unwrap();
        assert_eq!(req.parts.len(), 2);
        assert_eq!(req.parts[0].part_number, 1);
    }

    #[test]
    fn list_result_carries_next_markers_only_when_truncated() {
        use crate::registry::UploadSummary;

        let page = UploadsPage {
            uploads: vec![UploadSummary { upload_id: "u1".into(), key: "a".into(), initiated_at_unix_nanos: 0 }],
            is_truncated: true,
        };
        let result = ListMultipartUploadsResult::from_page("bck", page);
        assert_eq!(result.next_key_marker.as_deref(), Some("a"));
        assert_eq!(result.next_upload_id_marker.as_deref(), Some("u1"));

        let page = UploadsPage {
            uploads: vec![UploadSummary { upload_id: "u1".into(), key: "a".into(), initiated_at_unix_nanos: 0 }],
            is_truncated: false,
        };
        let result = ListMultipartUploadsResult::from_page("bck", page);
        assert!(result.next_key_marker.is_none());
    }

    #[test]
    fn init_result_serializes_expected_fields() {
        let result = InitiateMultipartUploadResult {
            bucket: "bck".into(),
            key: "obj".into(),
            upload_id: "u1".into(),
        };
        let xml = to_xml(&result).unwrap();
        assert!(xml.contains("<UploadId>u1</UploadId>"));
    }
}
