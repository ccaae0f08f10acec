fn main() {
    std::process::exit(mcdex_lib::run())
}
