// Domain-layer modules and shared errors/models
pub mod urgency {
    pub use crate::urgency::*;
}

pub mod forecast {
    pub use crate::forecast::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod reporting {
    pub use crate::reporting::*;
}

pub mod validation {
    pub use crate::validation::*;
}

pub mod errors {
    pub use crate::errors::*;
}
