//! Turning caller input into files in the scratch area.

use std::sync::Arc;

use at_pipeline::{ScratchArea, UploadPurpose, WorkingFile};

use crate::download::Downloader;
use crate::error::ResolveError;
use crate::names::{get_name, get_name_with_revision};
use crate::registry::Registry;
use crate::resolver::Resolver;
use crate::url::{is_url, validate_url};

/// One input document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDocument {
    /// Uploaded bytes with the filename the caller claimed.
    Upload { filename: String, bytes: Vec<u8> },
    /// A URL to fetch.
    Url(String),
    /// A draft or RFC name, optionally pinned to a revision.
    Name {
        name: String,
        revision: Option<String>,
    },
}

impl SourceDocument {
    /// Classify a reference that is either a URL or a document name.
    #[must_use]
    pub fn from_reference(reference: &str) -> Self {
        if is_url(reference) {
            Self::Url(reference.to_owned())
        } else {
            Self::Name {
                name: reference.to_owned(),
                revision: None,
            }
        }
    }
}

/// The document a single input is compared against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counterpart {
    pub file: WorkingFile,
    /// True when the counterpart precedes the input rather than follows it.
    pub is_predecessor: bool,
}

/// Materializes [`SourceDocument`]s.
pub struct DocumentFetcher {
    resolver: Resolver,
    downloader: Downloader,
    scratch: ScratchArea,
    allowed_domains: Vec<String>,
}

impl DocumentFetcher {
    #[must_use]
    pub fn new(
        registry: Arc<dyn Registry>,
        downloader: Downloader,
        scratch: ScratchArea,
        allowed_domains: Vec<String>,
    ) -> Self {
        Self {
            resolver: Resolver::new(registry),
            downloader,
            scratch,
            allowed_domains,
        }
    }

    #[must_use]
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    #[must_use]
    pub fn scratch(&self) -> &ScratchArea {
        &self.scratch
    }

    /// Produce a local file for `source`.
    ///
    /// URLs are checked against the allow-list before any network access.
    /// Names resolve to the latest document of their lineage, or to the
    /// exact revision when one is given.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the upload is rejected, the URL is not
    /// allowed, the name is unknown, or the download fails.
    pub fn materialize(
        &self,
        source: &SourceDocument,
        purpose: UploadPurpose,
    ) -> Result<WorkingFile, ResolveError> {
        match source {
            SourceDocument::Upload { filename, bytes } => {
                Ok(self.scratch.save_upload(filename, bytes, purpose)?)
            }
            SourceDocument::Url(url) => {
                validate_url(url, &self.allowed_domains)?;
                self.downloader.fetch_url_to_file(url, &self.scratch)
            }
            SourceDocument::Name { name, revision } => {
                let reference = match revision.as_deref() {
                    Some(rev) if !rev.is_empty() => format!("{name}-{rev}"),
                    _ => name.clone(),
                };
                if get_name(&reference).is_none() {
                    tracing::error!(%reference, "Not a draft or RFC name");
                    return Err(ResolveError::UnknownName(reference));
                }
                let url = self.resolver.resolve_latest(&reference, None)?;
                self.downloader.fetch_url_to_file(&url, &self.scratch)
            }
        }
    }

    /// Fetch the document `file` should be diffed against.
    ///
    /// That is the latest revision of its lineage, or the revision before
    /// it when `file` already is the latest.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnknownName`] when the filename is not a
    /// draft or RFC name, and resolution or download errors otherwise.
    pub fn fetch_counterpart(&self, file: &WorkingFile) -> Result<Counterpart, ResolveError> {
        let filename = file.file_name();
        let (Some(name), Some(revision)) = (get_name(&filename), get_name_with_revision(&filename))
        else {
            tracing::error!(%filename, "Can not determine draft name");
            return Err(ResolveError::UnknownName(filename));
        };

        let resolution = self.resolver.lookup_latest(&name, Some(&revision))?;
        let file = self
            .downloader
            .fetch_url_to_file(&resolution.content_url, &self.scratch)?;
        Ok(Counterpart {
            file,
            is_predecessor: resolution.walked_back,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRegistry;
    use crate::registry::DocumentIdentity;
    use crate::test_server::{Reply, serve};
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn fetcher(temp: &TempDir, registry: MockRegistry) -> DocumentFetcher {
        DocumentFetcher::new(
            Arc::new(registry),
            Downloader::new(Duration::from_secs(5)),
            ScratchArea::new(temp.path()),
            vec!["ietf.org".to_owned()],
        )
    }

    fn record(name: &str, rev: &str, content_url: &str, previous: Option<&str>) -> DocumentIdentity {
        DocumentIdentity {
            name: Some(name.to_owned()),
            rev: Some(rev.to_owned()),
            content_url: Some(content_url.to_owned()),
            previous: previous.map(str::to_owned),
            previous_url: None,
        }
    }

    #[test]
    fn test_from_reference() {
        assert_eq!(
            SourceDocument::from_reference("https://www.ietf.org/id/draft-a-00.txt"),
            SourceDocument::Url("https://www.ietf.org/id/draft-a-00.txt".to_owned())
        );
        assert_eq!(
            SourceDocument::from_reference("draft-a-00"),
            SourceDocument::Name {
                name: "draft-a-00".to_owned(),
                revision: None
            }
        );
    }

    #[test]
    fn test_materialize_upload() {
        let temp = TempDir::new().unwrap();
        let source = SourceDocument::Upload {
            filename: "draft-a-00.md".to_owned(),
            bytes: b"# Hello".to_vec(),
        };

        let file = fetcher(&temp, MockRegistry::new())
            .materialize(&source, UploadPurpose::Document)
            .unwrap();

        assert_eq!(fs::read_to_string(file.path()).unwrap(), "# Hello");
    }

    #[test]
    fn test_materialize_upload_rejects_format() {
        let temp = TempDir::new().unwrap();
        let source = SourceDocument::Upload {
            filename: "draft-a-00.pdf".to_owned(),
            bytes: Vec::new(),
        };

        let err = fetcher(&temp, MockRegistry::new())
            .materialize(&source, UploadPurpose::Document)
            .unwrap_err();

        assert!(matches!(err, ResolveError::Scratch(_)));
    }

    #[test]
    fn test_materialize_url_checks_allow_list_first() {
        let temp = TempDir::new().unwrap();
        let source = SourceDocument::Url("http://127.0.0.1:9/draft-a-00.txt".to_owned());

        let err = fetcher(&temp, MockRegistry::new())
            .materialize(&source, UploadPurpose::Document)
            .unwrap_err();

        assert_eq!(err.to_string(), "127.0.0.1:9 domain is not allowed.");
        assert_eq!(fs::read_dir(temp.path()).map_or(0, Iterator::count), 0);
    }

    #[test]
    fn test_materialize_name_with_revision() {
        let temp = TempDir::new().unwrap();
        let (base_url, _server) = serve(vec![Reply::new(200, "draft text\n")]);
        let registry = MockRegistry::new().with_record(
            "draft-a-01",
            record("draft-a", "01", &format!("{base_url}/draft-a-01.txt"), None),
        );
        let fetcher = fetcher(&temp, registry);

        let file = fetcher
            .materialize(
                &SourceDocument::Name {
                    name: "draft-a".to_owned(),
                    revision: Some("01".to_owned()),
                },
                UploadPurpose::Document,
            )
            .unwrap();

        assert_eq!(file.file_name(), "draft-a-01.txt");
        assert_eq!(fs::read_to_string(file.path()).unwrap(), "draft text\n");
    }

    #[test]
    fn test_materialize_unknown_name() {
        let temp = TempDir::new().unwrap();
        let registry = Arc::new(MockRegistry::new());
        let fetcher = DocumentFetcher::new(
            Arc::clone(&registry) as Arc<dyn Registry>,
            Downloader::new(Duration::from_secs(5)),
            ScratchArea::new(temp.path()),
            Vec::new(),
        );

        let err = fetcher
            .materialize(
                &SourceDocument::from_reference("notadraft"),
                UploadPurpose::Document,
            )
            .unwrap_err();

        assert_eq!(err.to_string(), "Can not determine draft/rfc: notadraft");
        assert!(registry.lookups().is_empty());
    }

    #[test]
    fn test_fetch_counterpart_when_input_is_latest() {
        let temp = TempDir::new().unwrap();
        let (base_url, server) = serve(vec![Reply::new(200, "revision 01\n")]);
        let registry = MockRegistry::new()
            .with_record(
                "draft-a",
                record("draft-a", "02", &format!("{base_url}/draft-a-02.txt"), Some("draft-a-01")),
            )
            .with_record(
                "draft-a-01",
                record("draft-a", "01", &format!("{base_url}/draft-a-01.txt"), None),
            );
        let fetcher = fetcher(&temp, registry);

        let counterpart = fetcher
            .fetch_counterpart(&WorkingFile::new("/scratch/1/draft-a-02.txt"))
            .unwrap();

        assert!(counterpart.is_predecessor);
        assert_eq!(counterpart.file.file_name(), "draft-a-01.txt");
        assert!(server.join().unwrap()[0].starts_with("GET /draft-a-01.txt "));
    }

    #[test]
    fn test_fetch_counterpart_when_input_is_older() {
        let temp = TempDir::new().unwrap();
        let (base_url, _server) = serve(vec![Reply::new(200, "revision 02\n")]);
        let registry = MockRegistry::new().with_record(
            "draft-a",
            record("draft-a", "02", &format!("{base_url}/draft-a-02.txt"), Some("draft-a-01")),
        );

        let counterpart = fetcher(&temp, registry)
            .fetch_counterpart(&WorkingFile::new("/scratch/1/draft-a-00.txt"))
            .unwrap();

        assert!(!counterpart.is_predecessor);
        assert_eq!(counterpart.file.file_name(), "draft-a-02.txt");
    }

    #[test]
    fn test_fetch_counterpart_unknown_name() {
        let temp = TempDir::new().unwrap();

        let err = fetcher(&temp, MockRegistry::new())
            .fetch_counterpart(&WorkingFile::new("/scratch/1/notes.txt"))
            .unwrap_err();

        assert!(matches!(err, ResolveError::UnknownName(_)));
    }
}
