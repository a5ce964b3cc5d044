mod test_crud;
mod test_postgres;
mod test_upload;
