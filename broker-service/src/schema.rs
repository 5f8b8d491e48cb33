diesel::table! {
    properties (id) {
        id -> Uuid,
        name -> Varchar,
        address -> Nullable<Varchar>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    rooms (id) {
        id -> Uuid,
        property_id -> Uuid,
        name -> Varchar,
        room_type -> Nullable<Varchar>,
        capacity -> Nullable<Int4>,
        status -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    platform_listings (id) {
        id -> Uuid,
        room_id -> Uuid,
        platform -> Varchar,
        platform_room_id -> Varchar,
        active -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    reservations (id) {
        id -> Uuid,
        room_id -> Uuid,
        platform -> Varchar,
        platform_reservation_id -> Varchar,
        check_in -> Date,
        check_out -> Date,
        guest_name -> Nullable<Varchar>,
        guest_phone -> Nullable<Varchar>,
        guest_email -> Nullable<Varchar>,
        total_amount -> Nullable<Numeric>,
        status -> Varchar,
        booked_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    inventory_days (room_id, date) {
        room_id -> Uuid,
        date -> Date,
        status -> Varchar,
        reservation_id -> Nullable<Uuid>,
        block_reason -> Nullable<Varchar>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    event_audit (event_id) {
        event_id -> Uuid,
        platform -> Varchar,
        platform_reservation_id -> Nullable<Varchar>,
        event_type -> Varchar,
        external_room_id -> Nullable<Varchar>,
        check_in -> Nullable<Date>,
        check_out -> Nullable<Date>,
        guest_name -> Nullable<Varchar>,
        guest_phone -> Nullable<Varchar>,
        guest_email -> Nullable<Varchar>,
        total_amount -> Nullable<Numeric>,
        status -> Varchar,
        property_name -> Nullable<Varchar>,
        property_address -> Nullable<Varchar>,
        occurred_at -> Nullable<Timestamptz>,
        received_at -> Timestamptz,
        processed -> Bool,
        processed_at -> Nullable<Timestamptz>,
        room_id -> Nullable<Uuid>,
        reservation_id -> Nullable<Uuid>,
        error_message -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    failed_events (id) {
        id -> Uuid,
        event_id -> Varchar,
        platform -> Varchar,
        event_type -> Varchar,
        correlation_id -> Varchar,
        reservation_id -> Varchar,
        raw_payload -> Text,
        error_message -> Text,
        failed_at -> Timestamptz,
        retry_count -> Int4,
        resolved -> Bool,
    }
}

diesel::table! {
    raw_events (id) {
        id -> Uuid,
        event_id -> Nullable<Varchar>,
        platform -> Nullable<Varchar>,
        event_type -> Nullable<Varchar>,
        correlation_id -> Nullable<Varchar>,
        raw_body -> Text,
        received_at -> Timestamptz,
    }
}

diesel::joinable!(rooms -> properties (property_id));
diesel::joinable!(platform_listings -> rooms (room_id));
diesel::joinable!(reservations -> rooms (room_id));

diesel::allow_tables_to_appear_in_same_query!(
    event_audit,
    failed_events,
    inventory_days,
    platform_listings,
    properties,
    raw_events,
    reservations,
    rooms,
);
