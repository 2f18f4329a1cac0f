mod test_filter;
mod test_worker;
