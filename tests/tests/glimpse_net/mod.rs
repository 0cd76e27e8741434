mod end_to_end;
mod http_client;
