//! Diesel table definitions for the registry schema.
//!
//! Must match `backend/migrations` exactly; regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Registered users.
    ///
    /// Email uniqueness is enforced by the record store under an advisory
    /// lock rather than by an index.
    user_records (id) {
        /// Primary key: UUID v4 minted at creation.
        id -> Uuid,
        name -> Text,
        email -> Text,
        /// Public URL of the profile image.
        image_locator -> Text,
        /// Object key of the profile image; null for rows imported without one.
        image_key -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Blob uploads whose owning record has not been confirmed yet.
    upload_intents (user_id) {
        user_id -> Uuid,
        blob_key -> Text,
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(user_records, upload_intents);
