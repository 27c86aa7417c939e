use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    print!("{}", serde_yaml::to_string(&controller::CompassManagerMapping::crd())?);
    Ok(())
}
