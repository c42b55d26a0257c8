pub mod adjustment_repo;
pub mod maintenance_repo;
pub mod movement_repo;
pub mod station_repo;
pub mod supplier_repo;
pub mod vehicle_repo;
