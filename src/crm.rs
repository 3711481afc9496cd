/// CRM object and field names used by the portal

/// Sales agent login records
pub mod agent {
    pub const OBJECT: &str = "CustomObject1__c";
    pub const ID: &str = "Id";
    pub const NAME: &str = "Name";
    /// External partner id, accepted as a login identifier alongside `NAME`
    pub const PARTNER_ID: &str = "APID__c";
    /// Stored in plaintext by the CRM schema
    pub const SECRET: &str = "Field8__c";
    pub const COMPANY: &str = "Field9__c";
    pub const OWNER_REFERENCE: &str = "Field10__c";
}

/// Products a reseller company may sell
pub mod product {
    pub const OBJECT: &str = "CustomObject3__c";
    pub const ID: &str = "Id";
    pub const NAME: &str = "Name";
    pub const CATEGORY: &str = "Field1__c";
    pub const DESCRIPTION: &str = "Field2__c";
    /// Multi-select picklist of companies allowed to sell the product
    pub const RESELLERS: &str = "Field6__c";
}

/// Account (business deal) records
pub mod account {
    pub const OBJECT: &str = "Account";
    pub const ID: &str = "Id";
    pub const NAME: &str = "Name";
    pub const CREATED_DATE: &str = "CreatedDate";
    pub const OWNER_ID: &str = "OwnerId";
    /// Agent record that submitted the intake form
    pub const CREATED_BY_AGENT: &str = "Field71__c";
    pub const COMPANY: &str = "Field75__c";
    pub const REFERRAL_TYPE: &str = "Field72__c";
    pub const REFERRAL_PRODUCT: &str = "Field70__c";
    pub const STATUS: &str = "Status__c";
    pub const NOTE: &str = "Memo__c";
    pub const CALL_TIME: &str = "CallTime__c";

    /// Fields an agent may fill on the intake form
    pub const INTAKE_FIELDS: &[&str] = &[
        "Name",
        "X2__c",
        "Field28__c",
        "Field52__c",
        "Field59__c",
        "Field60__c",
        "Field53__c",
        "Field1__c",
        "Field2__c",
        "Field3__c",
        "Field4__c",
        "Field8__c",
        "Field7__c",
        "Field20__c",
        "Field22__c",
        "Field23__c",
        "Field36__c",
        "Field37__c",
        "Field112__c",
        "Field35__c",
        "ShippingPostalCode",
        "ShippingState",
        "ShippingCity",
        "ShippingStreet",
        "Field10__c",
        "Field11__c",
        "Field12__c",
        "Field13__c",
        "Field14__c",
        "Field72__c",
        "Field70__c",
    ];

    /// Intake fields that must be non-blank
    pub const REQUIRED_FIELDS: &[&str] = &[NAME, REFERRAL_TYPE, REFERRAL_PRODUCT];

    /// Intake picklists whose active values are offered on the form
    pub const INTAKE_PICKLISTS: &[&str] = &[
        "Field72__c",
        "Field28__c",
        "Field7__c",
        "Field20__c",
        "Field22__c",
        "Field23__c",
        "Field36__c",
        "Field112__c",
    ];

    /// Columns shown on the worklist and edit views
    pub const WORKLIST_FIELDS: &[&str] = &[
        ID,
        NAME,
        STATUS,
        NOTE,
        CALL_TIME,
        REFERRAL_TYPE,
        REFERRAL_PRODUCT,
        CREATED_DATE,
    ];
}

/// Call activity log entries
pub mod task {
    pub const OBJECT: &str = "Task";
    pub const SUBJECT: &str = "Subject";
    pub const OWNER_ID: &str = "OwnerId";
    pub const ACTIVITY_DATE: &str = "ActivityDate";
    pub const RELATED_TO: &str = "WhatId";
    pub const STATUS: &str = "Status";
    pub const SUBTYPE: &str = "TaskSubtype";
    pub const TYPE: &str = "Type";
    pub const CALL_RESULT: &str = "CallDisposition";
    pub const DESCRIPTION: &str = "Description";

    pub const STATUS_COMPLETED: &str = "Completed";
    pub const SUBTYPE_CALL: &str = "Call";
}

/// Whether `id` has the shape of a CRM record id (15 or 18 alphanumerics)
pub fn is_record_id(id: &str) -> bool {
    matches!(id.len(), 15 | 18) && id.chars().all(|c| c.is_ascii_alphanumeric())
}
