//! Status enums mapping to SMALLINT columns in the `jobs` table.
//!
//! Each variant's discriminant is the value stored in the database. The
//! wire name (JSON) of job and entity statuses is the variant name itself,
//! e.g. `"ContentGenerated"`; product types are lowercase (`"audio"`).

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal => $label:literal ),+ $(,)?
        }
    ) => {
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        $(#[$meta])*
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Resolve a database status ID.
            pub fn from_id(id: StatusId) -> Result<Self, CoreError> {
                match id {
                    $( $val => Ok(Self::$variant), )+
                    other => Err(CoreError::Internal(format!(
                        concat!("Unknown ", stringify!($name), " id {}"),
                        other
                    ))),
                }
            }

            /// Wire name, identical to the serde representation.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $label, )+
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }

        impl TryFrom<StatusId> for $name {
            type Error = CoreError;

            fn try_from(id: StatusId) -> Result<Self, Self::Error> {
                Self::from_id(id)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

define_status_enum! {
    /// Processing status of a job. See [`crate::state_machine`] for the graph.
    JobStatus {
        Processing = 1 => "Processing",
        ContentGenerated = 2 => "ContentGenerated",
        CreatingProduct = 3 => "CreatingProduct",
        Completed = 4 => "Completed",
        Failed = 5 => "Failed",
        Expired = 6 => "Expired",
        Cancelled = 7 => "Cancelled",
    }
}

define_status_enum! {
    /// Visibility flag, independent of [`JobStatus`].
    EntityStatus {
        Active = 1 => "Active",
        Deleted = 2 => "Deleted",
    }
}

define_status_enum! {
    /// Output kind chosen by the user when confirming generated content.
    #[serde(rename_all = "lowercase")]
    ProductType {
        Audio = 1 => "audio",
        Video = 2 => "video",
    }
}

impl JobStatus {
    /// Completed, Failed, Expired and Cancelled have no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Expired | Self::Cancelled
        )
    }

    /// Whether a job in this status carries a content artifact.
    pub fn holds_content(self) -> bool {
        matches!(
            self,
            Self::ContentGenerated | Self::CreatingProduct | Self::Completed
        )
    }
}

impl std::str::FromStr for JobStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::Processing,
            Self::ContentGenerated,
            Self::CreatingProduct,
            Self::Completed,
            Self::Failed,
            Self::Expired,
            Self::Cancelled,
        ]
        .into_iter()
        .find(|status| status.as_str() == s)
        .ok_or_else(|| CoreError::InvalidState(format!("Unknown job status '{s}'")))
    }
}

impl std::str::FromStr for ProductType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(Self::Audio),
            "video" => Ok(Self::Video),
            other => Err(CoreError::InvalidState(format!(
                "Unsupported product type '{other}'. Must be one of: audio, video"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_ids_match_migration_seed() {
        assert_eq!(JobStatus::Processing.id(), 1);
        assert_eq!(JobStatus::ContentGenerated.id(), 2);
        assert_eq!(JobStatus::CreatingProduct.id(), 3);
        assert_eq!(JobStatus::Completed.id(), 4);
        assert_eq!(JobStatus::Failed.id(), 5);
        assert_eq!(JobStatus::Expired.id(), 6);
        assert_eq!(JobStatus::Cancelled.id(), 7);
    }

    #[test]
    fn unknown_status_id_is_rejected() {
        assert!(JobStatus::from_id(0).is_err());
        assert!(JobStatus::from_id(8).is_err());
        assert_eq!(JobStatus::try_from(4).unwrap(), JobStatus::Completed);
    }

    #[test]
    fn wire_names_match_serde() {
        for status in [
            JobStatus::Processing,
            JobStatus::ContentGenerated,
            JobStatus::Completed,
            JobStatus::Cancelled,
        ] {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, status.as_str());
        }
        assert_eq!(serde_json::to_value(ProductType::Video).unwrap(), "video");
        assert_eq!(
            serde_json::from_str::<ProductType>("\"audio\"").unwrap(),
            ProductType::Audio
        );
    }

    #[test]
    fn unsupported_product_type_is_invalid_state() {
        let err = "podcast".parse::<ProductType>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));
    }

    #[test]
    fn job_status_parses_wire_names_only() {
        assert_eq!(
            "ContentGenerated".parse::<JobStatus>().unwrap(),
            JobStatus::ContentGenerated
        );
        assert!(matches!(
            "Done".parse::<JobStatus>(),
            Err(CoreError::InvalidState(_))
        ));
    }

    #[test]
    fn terminal_and_content_sets() {
        assert!(!JobStatus::Processing.is_terminal());
        assert!(!JobStatus::CreatingProduct.is_terminal());
        assert!(JobStatus::Expired.is_terminal());
        assert!(JobStatus::Completed.holds_content());
        assert!(!JobStatus::Failed.holds_content());
    }
}
