use prost::Message;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Compile protobuf definitions from the checked-in file descriptor set
    // (proto/transfer.bin, the `protoc --descriptor_set_out` encoding of
    // proto/transfer.proto) so builds do not require a protoc binary.
    println!("cargo:rerun-if-changed=proto/transfer.bin");
    println!("cargo:rerun-if-changed=proto/transfer.proto");

    let bytes = std::fs::read("proto/transfer.bin")?;
    let fds = prost_types::FileDescriptorSet::decode(bytes.as_slice())?;

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_fds(fds)?;

    Ok(())
}
