pub mod hostnames;

pub use hostnames::HostnameRepository;
