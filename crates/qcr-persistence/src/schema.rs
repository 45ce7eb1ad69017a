// Esquema Diesel. Identificadores como texto (UUID), instantes en
// milisegundos desde epoch y JSON serializado como texto.
use diesel::allow_tables_to_appear_in_same_query;
diesel::table! {
    datasets (id) {
        id -> Text,
        backend_id -> Text,
        filename -> Text,
        display_filename -> Text,
        owner_id -> Nullable<Text>,
        group_id -> Text,
        filetype -> Nullable<Text>,
        created_at_ts -> BigInt,
        active -> Bool,
    }
}
diesel::table! {
    applications (id) {
        id -> Text,
        name -> Text,
        version -> Text,
        slug -> Text,
        url -> Nullable<Text>,
        description -> Nullable<Text>,
        port -> Nullable<Integer>,
        active -> Bool,
    }
}
diesel::table! {
    commands (id) {
        id -> Text,
        application_id -> Text,
        name -> Text,
        description -> Nullable<Text>,
        interactive -> Bool,
    }
}
diesel::table! {
    command_parameters (id) {
        id -> Text,
        command_id -> Text,
        position -> Integer,
        name -> Text,
        dtype -> Text,
        description -> Nullable<Text>,
        required -> Bool,
        default_value -> Nullable<Text>,
        validation -> Nullable<Text>,
    }
}
diesel::table! {
    process_steps (id) {
        id -> Text,
        command_id -> Text,
        infile_id -> Nullable<Text>,
        outfile_id -> Text,
        parameters -> Text,
        created_at_ts -> BigInt,
    }
}
diesel::table! {
    session_references (id) {
        id -> Text,
        user_id -> Text,
        command_id -> Text,
        application_id -> Text,
        session_id -> Text,
        kind -> Text,
        dataset_id -> Nullable<Text>,
        parameters -> Text,
        start_time_ts -> BigInt,
    }
}
allow_tables_to_appear_in_same_query!(datasets,
                                      applications,
                                      commands,
                                      command_parameters,
                                      process_steps,
                                      session_references);
