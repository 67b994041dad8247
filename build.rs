fn main() {
    // Emits ESP-IDF cfg/link arguments only when the espidf feature is
    // enabled; host-target test builds need none of them.
    if std::env::var_os("CARGO_FEATURE_ESPIDF").is_some() {
        embuild::espidf::sysenv::output();
    }
}
