pub mod opt_net;
pub mod policy;
