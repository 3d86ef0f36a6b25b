pub(crate) mod availability;
pub(crate) mod delivery;
pub(crate) mod item;
pub(crate) mod proximity;
pub(crate) mod reliability;
pub(crate) mod skills;
pub(crate) mod urgency;
