use nimbus_placement::application::{Application, PolicyBinding, VmTemplate};
use nimbus_placement::collaborators::{InMemoryVmStatus, VmStatusSource};
use nimbus_placement::deployment::{Deployment, MachineStatus, VirtualMachine, VmDeploymentSpec};
use nimbus_placement::error::{CollaboratorError, DeployerError};

// Virtualization layer which can't be reached.
struct UnreachableStatus;

impl VmStatusSource for UnreachableStatus {
    fn list_machine_ids(&self) -> Result<Vec<String>, CollaboratorError> {
        Ok(Vec::new())
    }

    fn fetch_machine(&self, id: &str) -> Result<VirtualMachine, CollaboratorError> {
        Err(CollaboratorError::Unreachable(id.to_string()))
    }

    fn fetch_machine_status(&self, id: &str) -> Result<MachineStatus, CollaboratorError> {
        Err(CollaboratorError::Unreachable(id.to_string()))
    }
}

fn spec(host: &str) -> VmDeploymentSpec {
    VmDeploymentSpec::new("web", host, Some("store"))
}

#[test]
// Specs can be replaced only until the deployment is launched.
fn test_replace_specs() {
    let mut deployment = Deployment::new("deployment-1");
    deployment.add_spec(spec("h1")).unwrap();
    deployment.replace_specs(vec![spec("h2"), spec("h3")]).unwrap();
    assert_eq!(deployment.specs().len(), 2);

    deployment.mark_launched();
    assert!(deployment.is_launched());
    assert!(matches!(
        deployment.replace_specs(vec![]),
        Err(DeployerError::Contract(_))
    ));
    assert!(deployment.add_spec(spec("h4")).is_err());
    assert_eq!(deployment.specs().len(), 2);
}

#[test]
// Refresh drops vanished machines, adopts moved ones and keeps launching ones untouched.
fn test_refresh_machines() {
    let mut deployment = Deployment::new("deployment-1");
    deployment.add_machine(VirtualMachine::new("gone", "h1", MachineStatus::On), spec("h1"));
    deployment.add_machine(VirtualMachine::new("moved", "h1", MachineStatus::On), spec("h1"));
    deployment.add_machine(VirtualMachine::new("pending", "h1", MachineStatus::Launching), spec("h1"));
    deployment.add_machine(VirtualMachine::new("started", "h1", MachineStatus::Launching), spec("h1"));
    deployment.mark_launched();

    let status = InMemoryVmStatus::new()
        .with_machine(VirtualMachine::new("moved", "h2", MachineStatus::On).with_store("s2"))
        .with_machine(VirtualMachine::new("pending", "h3", MachineStatus::Launching))
        .with_machine(VirtualMachine::new("started", "h4", MachineStatus::On));

    deployment.refresh_machines(&status).unwrap();
    let machines: Vec<_> = deployment.machines().map(|m| &m.machine).collect();
    assert_eq!(machines.len(), 3);
    assert_eq!(machines[0].id, "moved");
    assert_eq!(machines[0].host, "h2");
    assert_eq!(machines[0].stores, vec!["s2".to_string()]);
    assert_eq!(machines[1].id, "pending");
    assert_eq!(machines[1].host, "h1");
    assert_eq!(machines[2].host, "h4");
    assert_eq!(deployment.spec_for_machine("started"), Some(&spec("h1")));
}

#[test]
// A launching machine unknown to the virtualization layer is kept, transport failures are reported.
fn test_refresh_unknown_launching_machine() {
    let mut deployment = Deployment::new("deployment-1");
    deployment.add_machine(VirtualMachine::new("vm-failed", "h1", MachineStatus::Launching), spec("h1"));
    deployment.mark_launched();

    let machines = deployment.refreshed_machines(&InMemoryVmStatus::new()).unwrap();
    assert_eq!(machines.len(), 1);
    assert_eq!(machines[0].machine.id, "vm-failed");
    assert_eq!(machines[0].machine.status, MachineStatus::Launching);

    assert!(matches!(
        deployment.refreshed_machines(&UnreachableStatus),
        Err(CollaboratorError::Unreachable(_))
    ));
}

#[test]
// Machines of a stored deployment can be removed through the application.
fn test_application_deployments() {
    let mut application = Application::new("app", "app", PolicyBinding::new("random"));
    application.put_template(VmTemplate::new("web"));
    application.put_template(VmTemplate::new("db"));
    assert_eq!(application.templates().count(), 2);
    application.set_policy(PolicyBinding::with_config("locality", "maxVmsPerHost=1"));
    assert_eq!(application.policy().to_string(), "locality[maxVmsPerHost=1]");

    let mut deployment = Deployment::new("deployment-1");
    deployment.add_machine(VirtualMachine::new("vm-1", "h1", MachineStatus::On), spec("h1"));
    deployment.add_machine(VirtualMachine::new("vm-2", "h2", MachineStatus::On), spec("h2"));
    deployment.mark_launched();
    application.put_deployment(deployment);

    let removed = application
        .deployment_mut("deployment-1")
        .unwrap()
        .remove_machine("vm-1")
        .unwrap();
    assert_eq!(removed.spec, spec("h1"));
    let deployment = application.deployment("deployment-1").unwrap();
    assert_eq!(deployment.machines().count(), 1);
    assert_eq!(deployment.spec_for_machine("vm-1"), None);
    assert!(application.deployment_mut("deployment-2").is_none());
}

#[test]
// Only launched deployments contribute placed machines.
fn test_placed_machines() {
    let mut application = Application::new("app", "app", PolicyBinding::new("random"));
    application.put_template(VmTemplate::new("web"));

    let mut launched = Deployment::new("deployment-1");
    launched.add_machine(VirtualMachine::new("vm-1", "h1", MachineStatus::On), spec("h1"));
    launched.mark_launched();
    let mut planned = Deployment::with_specs("deployment-2", vec![spec("h2")]);
    planned.add_machine(VirtualMachine::new("vm-2", "h2", MachineStatus::On), spec("h2"));
    application.put_deployment(launched);
    application.put_deployment(planned);

    let status = InMemoryVmStatus::new()
        .with_machine(VirtualMachine::new("vm-1", "h1", MachineStatus::On))
        .with_machine(VirtualMachine::new("vm-2", "h2", MachineStatus::On));
    let placed = application.placed_machines(&status).unwrap();
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].machine.id, "vm-1");
}

#[test]
// Policy binding round-trips through its textual form.
fn test_policy_binding() {
    let binding = PolicyBinding::parse("locality[maxVmsPerHost=2]");
    assert_eq!(binding, PolicyBinding::with_config("locality", "maxVmsPerHost=2"));
    assert_eq!(binding.to_string(), "locality[maxVmsPerHost=2]");
    assert_eq!(PolicyBinding::parse(" hdfs ").to_string(), "hdfs");
}
