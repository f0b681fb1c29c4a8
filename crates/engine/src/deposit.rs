//! The deposit state machine.
//!
//! One engine instance serves the whole process. Each operation runs as a
//! single task: authorization gates fire before any payload byte is
//! examined, ingest runs next, and only then does the store commit. A
//! failure at any gate leaves no partial state behind; the only deliberately
//! non-transactional step is collaborator notification, which happens after
//! commit and degrades to a receipt warning.

use crate::auth::{AuthHandle, ConfigAuthenticator, Credentials, Principal};
use crate::error::{ErrorKind, Result};
use crate::negotiate::ContentNegotiator;
use crate::notify::{NoopNotifier, NotifierHandle};
use crate::receipt::DepositReceipt;
use crate::servicedoc::ServiceDocumentBuilder;
use futures::StreamExt;
use scabbard_config::{CollectionConfig, SwordConfig};
use scabbard_packaging::{Package, PackagedFile, Registry, VersionContent};
use scabbard_store::{EntryMetadata, ItemRecord, StoreHandle, StoredFile, VersionSeed};
use std::sync::Arc;

/// The declared facts of an incoming deposit.
#[derive(Clone, Debug)]
pub struct DepositRequest {
    pub payload: Vec<u8>,
    /// Declared content type of the payload.
    pub content_type: String,
    /// Declared packaging URI, if any.
    pub packaging: Option<String>,
    /// Mediation target, when depositing for someone else.
    pub on_behalf_of: Option<String>,
}

pub struct DepositEngine {
    config: SwordConfig,
    store: StoreHandle,
    registry: Registry,
    authenticator: AuthHandle,
    notifier: NotifierHandle,
    media_negotiator: ContentNegotiator,
    container_negotiator: ContentNegotiator,
}

impl DepositEngine {
    pub fn new(
        config: SwordConfig,
        store: StoreHandle,
        authenticator: AuthHandle,
        notifier: NotifierHandle,
    ) -> Self {
        let registry = Registry::from_config(&config);
        let media_negotiator =
            ContentNegotiator::new(config.media_resource_formats.clone(), config.media_resource_default.clone());
        let container_negotiator =
            ContentNegotiator::new(config.container_formats.clone(), config.container_format_default.clone());
        Self { config, store, registry, authenticator, notifier, media_negotiator, container_negotiator }
    }

    /// Engine with the config-backed authenticator and no collaborator.
    pub fn with_defaults(config: SwordConfig, store: StoreHandle) -> Self {
        let authenticator = Arc::new(ConfigAuthenticator::from_config(&config));
        Self::new(config, store, authenticator, Arc::new(NoopNotifier))
    }

    pub fn config(&self) -> &SwordConfig {
        &self.config
    }

    async fn principal_for(&self, credentials: &Credentials, on_behalf_of: Option<&str>) -> Result<Principal> {
        let principal = self.authenticator.authenticate(credentials).await?;
        match on_behalf_of {
            Some(target) => self.authenticator.authorize_on_behalf_of(principal, target).await,
            None => Ok(principal),
        }
    }

    /// Fetch a record that must exist and still be active.
    async fn active_record(&self, item: &str) -> Result<ItemRecord> {
        match self.store.get_item(item).await.map_err(ErrorKind::store)? {
            None => exn::bail!(ErrorKind::NotFound(item.to_string())),
            Some(record) if !record.is_active() => exn::bail!(ErrorKind::Gone(item.to_string())),
            Some(record) => Ok(record),
        }
    }

    /// Header-level gates that run before the payload is touched.
    fn check_request(&self, collection: Option<&CollectionConfig>, request: &DepositRequest) -> Result<()> {
        if let Some(packaging) = &request.packaging {
            if *packaging == self.config.error_content_package {
                exn::bail!(ErrorKind::ErrorContentRequested);
            }
            if let Some(collection) = collection
                && !collection.accept_packaging.is_empty()
                && !collection.accept_packaging.contains(packaging)
            {
                exn::bail!(ErrorKind::UnsupportedPackaging {
                    content_type: request.content_type.clone(),
                    packaging: packaging.clone(),
                });
            }
        }
        let limit = match collection {
            Some(collection) => self.config.effective_max_upload(collection),
            None => self.config.max_upload_size,
        };
        if let Some(limit) = limit
            && request.payload.len() as u64 > limit
        {
            exn::bail!(ErrorKind::PayloadTooLarge { size: request.payload.len() as u64, limit });
        }
        Ok(())
    }

    /// Resolve the codec and unpack the payload into storable files.
    fn ingest(&self, request: &DepositRequest) -> Result<(EntryMetadata, Vec<StoredFile>, VersionSeed)> {
        let ingester = self
            .registry
            .resolve_ingester(&request.content_type, request.packaging.as_deref())
            .map_err(ErrorKind::packaging)?;
        let files = ingester
            .ingest(&request.payload, &request.content_type)
            .map_err(ErrorKind::packaging)?;
        let metadata = files.iter().find_map(|file| file.metadata.clone()).unwrap_or_default();
        let stored = files.into_iter().map(PackagedFile::into_stored).collect();
        let seed = VersionSeed {
            content_type: request.content_type.clone(),
            packaging: request.packaging.clone(),
            payload_size: request.payload.len() as u64,
        };
        Ok((metadata, stored, seed))
    }

    /// Tell the collaborator about a committed deposit. Never fails the
    /// deposit itself.
    async fn notify(&self, receipt: &mut DepositReceipt) {
        if let Err(err) = self.notifier.notify(receipt).await {
            tracing::warn!(collaborator = self.notifier.name(), error = %err, "collaborator notification failed");
            receipt
                .warnings
                .push(format!("collaborator `{}` could not be notified: {err}", self.notifier.name()));
        }
    }

    /// Deposit a new item into a collection.
    #[tracing::instrument(skip_all, fields(collection = %collection_id, content_type = %request.content_type))]
    pub async fn create(
        &self,
        collection_id: &str,
        request: DepositRequest,
        credentials: &Credentials,
    ) -> Result<DepositReceipt> {
        self.principal_for(credentials, request.on_behalf_of.as_deref()).await?;
        if self.config.accept_nothing {
            exn::bail!(ErrorKind::DepositRejected);
        }
        let Some(collection) = self.config.collection(collection_id) else {
            exn::bail!(ErrorKind::NotFound(collection_id.to_string()));
        };
        self.check_request(Some(&collection), &request)?;
        let (metadata, files, seed) = self.ingest(&request)?;
        let record = self
            .store
            .create_item(collection_id, metadata, seed, files)
            .await
            .map_err(ErrorKind::store)?;
        tracing::debug!(item = %record.id, "item created");
        let mut receipt = DepositReceipt::from_record(&self.config, &record);
        self.notify(&mut receipt).await;
        Ok(receipt)
    }

    /// Replace an item's media resource, appending the next content version.
    #[tracing::instrument(skip_all, fields(item = %item_id, content_type = %request.content_type))]
    pub async fn update(
        &self,
        item_id: &str,
        request: DepositRequest,
        credentials: &Credentials,
    ) -> Result<DepositReceipt> {
        self.principal_for(credentials, request.on_behalf_of.as_deref()).await?;
        let record = self.active_record(item_id).await?;
        if !self.config.allow_update {
            exn::bail!(ErrorKind::MethodNotAllowed("update"));
        }
        if self.config.accept_nothing {
            exn::bail!(ErrorKind::DepositRejected);
        }
        self.check_request(self.config.collection(&record.collection).as_ref(), &request)?;
        let (_, files, seed) = self.ingest(&request)?;
        let record = self
            .store
            .append_version(item_id, seed, files)
            .await
            .map_err(ErrorKind::store)?;
        tracing::debug!(item = %record.id, version = record.current_version().map_or(0, |v| v.number), "version appended");
        let mut receipt = DepositReceipt::from_record(&self.config, &record);
        self.notify(&mut receipt).await;
        Ok(receipt)
    }

    /// Retrieve the media resource in a negotiated representation.
    #[tracing::instrument(skip_all, fields(item = %item_id))]
    pub async fn retrieve_media(&self, item_id: &str, accept: Option<&str>) -> Result<Package> {
        let record = self.active_record(item_id).await?;
        let format = self.media_negotiator.negotiate(accept)?;
        let disseminator = self
            .registry
            .resolve_disseminator(&format.content_type, format.packaging.as_deref())
            .map_err(ErrorKind::packaging)?;
        let mut contents = Vec::with_capacity(record.versions.len());
        for version in &record.versions {
            let files = self
                .store
                .read_version_files(&record.id, version.number)
                .await
                .map_err(ErrorKind::store)?;
            contents.push(VersionContent { version: version.clone(), files });
        }
        disseminator.package(&contents).map_err(ErrorKind::packaging)
    }

    /// Retrieve the container as a Deposit Receipt entry in a negotiated
    /// representation.
    #[tracing::instrument(skip_all, fields(item = %item_id))]
    pub async fn retrieve_container(&self, item_id: &str, accept: Option<&str>) -> Result<Package> {
        let record = self.active_record(item_id).await?;
        let format = self.container_negotiator.negotiate(accept)?;
        let receipt = DepositReceipt::from_record(&self.config, &record);
        Ok(Package { data: receipt.to_entry(&self.config)?, content_type: format.content_type })
    }

    /// Project the receipt for an item without rendering it.
    pub async fn receipt(&self, item_id: &str) -> Result<DepositReceipt> {
        let record = self.active_record(item_id).await?;
        Ok(DepositReceipt::from_record(&self.config, &record))
    }

    /// Delete an item. The record survives; the configured purge policy
    /// decides whether payload files do too.
    #[tracing::instrument(skip_all, fields(item = %item_id))]
    pub async fn delete(
        &self,
        item_id: &str,
        credentials: &Credentials,
        on_behalf_of: Option<&str>,
    ) -> Result<()> {
        self.principal_for(credentials, on_behalf_of).await?;
        self.active_record(item_id).await?;
        if !self.config.allow_delete {
            exn::bail!(ErrorKind::MethodNotAllowed("delete"));
        }
        self.store
            .mark_deleted(item_id, self.config.purge_policy)
            .await
            .map_err(ErrorKind::store)?;
        tracing::debug!(item = %item_id, "item deleted");
        Ok(())
    }

    /// Replace an item's metadata from an Atom entry document, leaving the
    /// content versions untouched.
    #[tracing::instrument(skip_all, fields(item = %item_id))]
    pub async fn replace_metadata(
        &self,
        item_id: &str,
        entry: &[u8],
        credentials: &Credentials,
        on_behalf_of: Option<&str>,
    ) -> Result<DepositReceipt> {
        self.principal_for(credentials, on_behalf_of).await?;
        self.active_record(item_id).await?;
        if !self.config.allow_update {
            exn::bail!(ErrorKind::MethodNotAllowed("update"));
        }
        let files = self
            .registry
            .entry_ingester()
            .ingest(entry, "application/atom+xml;type=entry")
            .map_err(ErrorKind::packaging)?;
        let Some(metadata) = files.into_iter().find_map(|file| file.metadata) else {
            exn::bail!(ErrorKind::Malformed("entry document carried no metadata".into()));
        };
        let record = self
            .store
            .replace_metadata(item_id, metadata)
            .await
            .map_err(ErrorKind::store)?;
        Ok(DepositReceipt::from_record(&self.config, &record))
    }

    /// The service document for an authenticated principal.
    pub async fn service_document(&self, credentials: &Credentials, on_behalf_of: Option<&str>) -> Result<Vec<u8>> {
        let principal = self.principal_for(credentials, on_behalf_of).await?;
        ServiceDocumentBuilder::new(&self.config).build(&principal)
    }

    /// Receipts for every active item in a collection, for the collection
    /// feed.
    #[tracing::instrument(skip_all, fields(collection = %collection_id))]
    pub async fn list_collection(&self, collection_id: &str) -> Result<Vec<DepositReceipt>> {
        if self.config.collection(collection_id).is_none() {
            exn::bail!(ErrorKind::NotFound(collection_id.to_string()));
        }
        let mut receipts = Vec::new();
        let mut items = self.store.list_items(collection_id);
        while let Some(item) = items.next().await {
            let record = item.map_err(ErrorKind::store)?;
            if record.is_active() {
                receipts.push(DepositReceipt::from_record(&self.config, &record));
            }
        }
        Ok(receipts)
    }
}
