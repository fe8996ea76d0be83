mod directory_store;
mod resolution;
