//! AtomPub service document builder.
//!
//! The service document is a pure projection of configuration; nothing in
//! it depends on stored state, so two requests under the same configuration
//! always see the same document.

use crate::atom;
use crate::auth::Principal;
use crate::error::Result;
use quick_xml::Writer;
use scabbard_config::SwordConfig;

pub struct ServiceDocumentBuilder<'a> {
    config: &'a SwordConfig,
}

impl<'a> ServiceDocumentBuilder<'a> {
    pub fn new(config: &'a SwordConfig) -> Self {
        Self { config }
    }

    /// Render the service document for an authenticated principal.
    #[tracing::instrument(skip_all, fields(identity = %principal.identity))]
    pub fn build(&self, principal: &Principal) -> Result<Vec<u8>> {
        let config = self.config;
        let base = config.base_url_slashed();
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        atom::write_decl(&mut writer)?;
        atom::start_element(
            &mut writer,
            "service",
            &[
                ("xmlns", atom::APP_NS),
                ("xmlns:atom", atom::ATOM_NS),
                ("xmlns:sword", atom::SWORD_NS),
                ("xmlns:dcterms", atom::DCTERMS_NS),
            ],
        )?;

        atom::text_element(&mut writer, "sword:version", &config.sword_version)?;
        if let Some(limit) = config.max_upload_size {
            atom::text_element(&mut writer, "sword:maxUploadSize", &limit.to_string())?;
        }

        atom::start_element(&mut writer, "workspace", &[])?;
        atom::text_element(&mut writer, "atom:title", "Main Site")?;

        // Advertise exactly the collections the deposit paths resolve, so a
        // client can deposit into anything the document lists.
        for collection in config.effective_collections() {
            let href = format!("{base}col/{}", collection.id);
            atom::start_element(&mut writer, "collection", &[("href", href.as_str())])?;
            atom::text_element(&mut writer, "atom:title", &collection.label)?;
            for accept in &config.app_accept {
                atom::text_element(&mut writer, "accept", accept)?;
            }
            for accept in &config.multipart_accept {
                atom::start_element(&mut writer, "accept", &[("alternate", "multipart-related")])?;
                writer
                    .write_event(quick_xml::events::Event::Text(quick_xml::events::BytesText::new(accept)))
                    .map_err(atom::wmap)?;
                atom::end_element(&mut writer, "accept")?;
            }
            atom::text_element(&mut writer, "sword:mediation", &config.security.mediation.to_string())?;
            atom::text_element(&mut writer, "sword:collectionPolicy", "Deposits are accepted as-is.")?;
            for packaging in &collection.accept_packaging {
                atom::text_element(&mut writer, "sword:acceptPackaging", packaging)?;
            }
            if config.use_sub {
                let sub = format!("{base}sd/{}", collection.id);
                atom::text_element(&mut writer, "sword:service", &sub)?;
            }
            atom::end_element(&mut writer, "collection")?;
        }

        atom::end_element(&mut writer, "workspace")?;
        atom::end_element(&mut writer, "service")?;
        Ok(writer.into_inner())
    }
}
