use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use quillsign_core::{
    DocumentPage, PdfDocument, PortalBackend, PortalError, PortalResult, SubAccountSession,
};

/// Permission-scoped access to the owning account's generated documents.
///
/// `download_only` gates which UI actions are offered, not which rows come
/// back; row restriction to the owning account is the backend's job.
pub struct DocumentAccess<B> {
    backend: Arc<B>,
    page_size: u32,
}

impl<B> DocumentAccess<B>
where
    B: PortalBackend,
{
    pub fn new(backend: Arc<B>, page_size: u32) -> Self {
        DocumentAccess { backend, page_size }
    }

    /// Fetch one page of the owning account's documents, newest first, plus
    /// the total count for pagination. Page numbers are 1-based.
    pub async fn page(
        &self,
        session: &SubAccountSession,
        page: u32,
    ) -> PortalResult<DocumentPage> {
        if !session.sub_account.permissions.pdf_access {
            return Err(PortalError::NotPermitted(
                "pdf access is disabled for this sub-account".to_string(),
            ));
        }
        let owner_id = &session.sub_account.main_account_id;
        let total = self.backend.count_documents(owner_id).await?;
        let documents = self
            .backend
            .list_documents(owner_id, page, self.page_size)
            .await?;
        Ok(DocumentPage { documents, total })
    }

    /// Decode the document content and save it under `dir`.
    ///
    /// The decoded byte length must match the recorded file size.
    pub async fn download(&self, document: &PdfDocument, dir: &Path) -> PortalResult<PathBuf> {
        let bytes = BASE64
            .decode(document.pdf_content.as_bytes())
            .map_err(|e| PortalError::Decode(format!("invalid document content: {e}")))?;

        if bytes.len() as i64 != document.file_size {
            return Err(PortalError::Decode(format!(
                "decoded size {} does not match recorded size {}",
                bytes.len(),
                document.file_size
            )));
        }

        // Only the final path component of the stored name is used.
        let file_name = Path::new(&document.file_name)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("document.pdf");
        let path = dir.join(file_name);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| PortalError::Storage(format!("failed to write download: {e}")))?;
        Ok(path)
    }
}

/// Data URL for opening a document in a new browsing context.
pub fn view_data_url(document: &PdfDocument) -> String {
    format!("data:application/pdf;base64,{}", document.pdf_content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_embeds_content() {
        let document = PdfDocument {
            id: "d1".to_string(),
            user_id: "m1".to_string(),
            file_name: "contract.pdf".to_string(),
            template_name: "nda".to_string(),
            form_title: "NDA".to_string(),
            signer_name: "Alice".to_string(),
            pdf_content: "JVBERi0=".to_string(),
            file_size: 6,
            created_at: chrono::Utc::now(),
        };
        assert_eq!(
            view_data_url(&document),
            "data:application/pdf;base64,JVBERi0="
        );
    }
}
