/// Products and picklist options offered to agents
use crate::{
    crm::{account, product},
    error::RemoteError,
    record_store::{Direction, Filter, QuerySpec, Record, RecordStore},
};
use std::{collections::BTreeMap, sync::Arc};

pub struct Catalog {
    store: Arc<dyn RecordStore>,
}

impl Catalog {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Products whose reseller list includes `company`
    ///
    /// Reseller options are `;`-separated, so a name containing `;` can
    /// never be one of them.
    pub async fn products_for_company(&self, company: &str) -> Result<Vec<Record>, RemoteError> {
        if company.contains(';') {
            tracing::warn!("Company name {:?} cannot match a reseller option", company);
            return Ok(Vec::new());
        }

        let spec = QuerySpec::select(
            product::OBJECT,
            &[
                product::ID,
                product::NAME,
                product::CATEGORY,
                product::DESCRIPTION,
                product::RESELLERS,
            ],
        )
        .filter(Filter::includes(product::RESELLERS, company))
        .order_by(product::NAME, Direction::Asc);

        Ok(self.store.query(&spec).await?.records)
    }

    /// Active values of every intake picklist, keyed by field name
    pub async fn intake_picklists(&self) -> Result<BTreeMap<String, Vec<String>>, RemoteError> {
        let schema = self.store.describe(account::OBJECT).await?;
        Ok(account::INTAKE_PICKLISTS
            .iter()
            .map(|field| (field.to_string(), schema.active_picklist_values(field)))
            .collect())
    }

    /// Active account status values
    pub async fn status_options(&self) -> Result<Vec<String>, RemoteError> {
        let schema = self.store.describe(account::OBJECT).await?;
        Ok(schema.active_picklist_values(account::STATUS))
    }
}
