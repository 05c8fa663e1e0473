fn main() {
    sewer_king_lib::run()
}
