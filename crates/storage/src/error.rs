use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StoreError {
    #[snafu(display("store entity '{entity}' with id '{id}' was not found"))]
    NotFound {
        stage: &'static str,
        entity: &'static str,
        id: String,
    },
    #[snafu(display("store entity '{entity}' with id '{id}' already exists"))]
    DuplicateIdentifier {
        stage: &'static str,
        entity: &'static str,
        id: String,
    },
    #[snafu(display("store id '{raw}' is invalid for {id_type}"))]
    InvalidId {
        stage: &'static str,
        id_type: &'static str,
        raw: String,
    },
    #[snafu(display("{field} on message '{message_id}' are already attached"))]
    AttachmentLocked {
        stage: &'static str,
        message_id: String,
        field: &'static str,
    },
    #[snafu(display("unknown chat mode '{raw}'"))]
    UnknownMode { stage: &'static str, raw: String },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateIdentifier { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
