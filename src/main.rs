fn main() {
    beebasic::term::main()
}
